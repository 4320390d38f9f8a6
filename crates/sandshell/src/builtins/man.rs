//! man builtin - short manual pages for the tools available in the sandbox

use async_trait::async_trait;

use super::{Builtin, Context};
use crate::error::Result;

const PAGES: &[(&str, &str)] = &[
    (
        "basename",
        "Usage: basename NAME [SUFFIX]\n\
         Print NAME with any leading directory components removed.\n\
         If specified, also remove a trailing SUFFIX.\n\n\
         Examples:\n  basename /usr/bin/sort       -> \"sort\"\n  basename include/stdio.h .h  -> \"stdio\"",
    ),
    (
        "cat",
        "Usage: cat [OPTION]... [FILE]...\n\
         Concatenate FILE(s) to standard output.\n\
         With no FILE, read standard input.\n\n\
         -n, --number   number all output lines",
    ),
    (
        "comm",
        "Usage: comm [OPTION]... FILE1 FILE2\n\
         Compare sorted files FILE1 and FILE2 line by line.\n\
         Column one holds lines unique to FILE1, column two lines unique to\n\
         FILE2 and column three lines common to both.\n\n\
         -1   suppress column 1\n\
         -2   suppress column 2\n\
         -3   suppress column 3",
    ),
    (
        "cut",
        "Usage: cut OPTION... [FILE]...\n\
         Print selected parts of lines from each FILE to standard output.\n\n\
         -d, --delimiter=DELIM   use DELIM instead of TAB for field delimiter\n\
         -f, --fields=LIST       select only these fields\n\
         -c, --characters=LIST   select only these characters",
    ),
    (
        "date",
        "Usage: date [OPTION]... [+FORMAT]\n\
         Display the current time in the given FORMAT.\n\n\
         -u, --utc   print Coordinated Universal Time (UTC)\n\n\
         Example: date +%Y-%m-%d",
    ),
    (
        "echo",
        "Usage: echo [SHORT-OPTION]... [STRING]...\n\
         Echo the STRING(s) to standard output.\n\n\
         -n   do not output the trailing newline\n\
         -e   enable interpretation of backslash escapes",
    ),
    (
        "find",
        "Usage: find [starting-point...] [expression]\n\
         Search for files in a directory hierarchy.\n\n\
         -name PATTERN   base of file name matches shell PATTERN\n\
         -type d|f       file is a directory or a regular file\n\
         -maxdepth N     descend at most N levels",
    ),
    (
        "fold",
        "Usage: fold [OPTION]... [FILE]...\n\
         Wrap input lines in each FILE, writing to standard output.\n\n\
         -w, --width=WIDTH   use WIDTH columns instead of 80\n\
         -s, --spaces        break at spaces",
    ),
    (
        "gawk",
        "Usage: awk [POSIX or GNU style options] 'program' file ...\n\
         Pattern scanning and processing language.\n\n\
         -F fs        use fs for the input field separator\n\
         -v var=val   assign value val to variable var\n\n\
         Example: awk -F '\\t' '{ print $1 }' data.tsv",
    ),
    (
        "grep",
        "Usage: grep [OPTION]... PATTERNS [FILE]...\n\
         Search for PATTERNS in each FILE.\n\n\
         -i, --ignore-case    ignore case distinctions\n\
         -v, --invert-match   select non-matching lines\n\
         -c, --count          print only a count of selected lines per FILE\n\
         -E, --extended-regexp   PATTERNS are extended regular expressions",
    ),
    (
        "head",
        "Usage: head [OPTION]... [FILE]...\n\
         Print the first 10 lines of each FILE to standard output.\n\n\
         -n, --lines=NUM   print the first NUM lines instead of the first 10",
    ),
    (
        "join",
        "Usage: join [OPTION]... FILE1 FILE2\n\
         For each pair of input lines with identical join fields, write a\n\
         line to standard output. The default join field is the first.\n\n\
         -1 FIELD   join on this FIELD of file 1\n\
         -2 FIELD   join on this FIELD of file 2\n\
         -t CHAR    use CHAR as input and output field separator",
    ),
    (
        "jq",
        "Usage: jq [OPTIONS] FILTER [FILES...]\n\
         Command-line JSON processor.\n\n\
         -r   output raw strings, not JSON texts\n\
         -c   compact instead of pretty-printed output\n\n\
         Example: jq '.items[] | .name' data.json",
    ),
    (
        "ls",
        "Usage: ls [OPTION]... [FILE]...\n\
         List information about the FILEs (the current directory by default).\n\n\
         -a, --all   do not ignore entries starting with .\n\
         -l          use a long listing format",
    ),
    (
        "md5sum",
        "Usage: md5sum [OPTION]... [FILE]...\n\
         Print or check MD5 (128-bit) checksums.\n\n\
         -c, --check   read checksums from the FILEs and check them",
    ),
    (
        "paste",
        "Usage: paste [OPTION]... [FILE]...\n\
         Write lines consisting of the sequentially corresponding lines from\n\
         each FILE, separated by TABs, to standard output.\n\n\
         -d, --delimiters=LIST   reuse characters from LIST instead of TABs\n\
         -s, --serial            paste one file at a time instead of in parallel",
    ),
    (
        "sed",
        "Usage: sed [OPTION]... {script} [input-file]...\n\
         Stream editor for filtering and transforming text.\n\n\
         -n   suppress automatic printing of pattern space\n\
         -e script   add the script to the commands to be executed\n\n\
         Example: sed 's/old/new/g' file.txt",
    ),
    (
        "seq",
        "Usage: seq [OPTION]... LAST\n  or:  seq [OPTION]... FIRST LAST\n  or:  seq [OPTION]... FIRST INCREMENT LAST\n\
         Print numbers from FIRST to LAST, in steps of INCREMENT.\n\n\
         -s, --separator=STRING   use STRING to separate numbers",
    ),
    (
        "shuf",
        "Usage: shuf [OPTION]... [FILE]\n\
         Write a random permutation of the input lines to standard output.\n\n\
         -n, --head-count=COUNT   output at most COUNT lines",
    ),
    (
        "sort",
        "Usage: sort [OPTION]... [FILE]...\n\
         Write sorted concatenation of all FILE(s) to standard output.\n\n\
         -n, --numeric-sort   compare according to string numerical value\n\
         -r, --reverse        reverse the result of comparisons\n\
         -u, --unique         output only the first of an equal run\n\
         -k, --key=KEYDEF     sort via a key",
    ),
    (
        "tail",
        "Usage: tail [OPTION]... [FILE]...\n\
         Print the last 10 lines of each FILE to standard output.\n\n\
         -n, --lines=NUM   output the last NUM lines instead of the last 10",
    ),
    (
        "tee",
        "Usage: tee [OPTION]... [FILE]...\n\
         Copy standard input to each FILE, and also to standard output.\n\n\
         -a, --append   append to the given FILEs, do not overwrite",
    ),
    (
        "tr",
        "Usage: tr [OPTION]... SET1 [SET2]\n\
         Translate, squeeze, and/or delete characters from standard input,\n\
         writing to standard output.\n\n\
         -d, --delete            delete characters in SET1, do not translate\n\
         -s, --squeeze-repeats   squeeze runs of a repeated character into one",
    ),
    (
        "uniq",
        "Usage: uniq [OPTION]... [INPUT [OUTPUT]]\n\
         Filter adjacent matching lines from INPUT, writing to OUTPUT.\n\n\
         -c, --count        prefix lines by the number of occurrences\n\
         -d, --repeated     only print duplicate lines, one for each group",
    ),
    (
        "wc",
        "Usage: wc [OPTION]... [FILE]...\n\
         Print newline, word, and byte counts for each FILE.\n\n\
         -c, --bytes   print the byte counts\n\
         -l, --lines   print the newline counts\n\
         -w, --words   print the word counts",
    ),
];

/// Manual page for `tool`, if there is one.
pub fn page(tool: &str) -> Option<&'static str> {
    PAGES
        .iter()
        .find(|(name, _)| *name == tool)
        .map(|(_, text)| *text)
}

/// The man builtin.
pub struct Man;

#[async_trait]
impl Builtin for Man {
    async fn execute(&self, ctx: Context<'_>) -> Result<String> {
        let tool = ctx.args.first().unwrap_or_default();
        Ok(match page(tool) {
            Some(text) => text.to_string(),
            None => format!("No manual entry for {}", tool),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins::test_support::Fixture;

    #[test]
    fn test_pages_sorted_and_unique() {
        let names: Vec<&str> = PAGES.iter().map(|(name, _)| *name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), 25);
    }

    #[tokio::test]
    async fn test_known_tool() {
        let fx = Fixture::new();
        let out = fx.run(&Man, &["wc"]).await.unwrap();
        assert!(out.starts_with("Usage: wc"));
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let fx = Fixture::new();
        let out = fx.run(&Man, &["samtools"]).await.unwrap();
        assert_eq!(out, "No manual entry for samtools");
    }
}

//! Command rewrites applied before argument resolution

use crate::parser::{CommandNode, Node, Redirect, RedirectOp};

/// Command name, replacement name, extra literal arguments.
const ALIASES: &[(&str, &str, &[&str])] = &[
    ("bowtie2", "bowtie2-align-s", &[]),
    ("awk", "gawk", &[]),
    ("ll", "ls", &["-l"]),
];

/// samtools subcommands whose `> FILE` becomes `-o FILE`
const SAMTOOLS_OUTPUT_SUBCOMMANDS: &[&str] = &["view", "sort", "cat", "collate"];

/// Rewrite a command node. Pure; applied once per command.
pub fn transform(cmd: &CommandNode) -> CommandNode {
    let mut cmd = cmd.clone();
    let Some(name) = cmd.literal_name().map(str::to_string) else {
        return cmd;
    };

    if let Some((_, replacement, extra)) = ALIASES.iter().find(|(alias, _, _)| *alias == name) {
        tracing::trace!(alias = %name, replacement, "expanding alias");
        cmd.name = Box::new(Node::literal(*replacement));
        cmd.args.extend(extra.iter().map(|arg| Node::literal(*arg)));
    }

    rewrite_samtools_output(&mut cmd);
    cmd
}

/// `samtools view ... > out.bam` writes binary data that cannot travel
/// through captured text output; let samtools write the file itself.
fn rewrite_samtools_output(cmd: &mut CommandNode) {
    if cmd.literal_name() != Some("samtools") || cmd.redirects.len() != 1 {
        return;
    }
    let subcommand = cmd.args.first().and_then(Node::as_literal);
    if !subcommand.is_some_and(|s| SAMTOOLS_OUTPUT_SUBCOMMANDS.contains(&s)) {
        return;
    }
    let Redirect::File {
        fd: 1,
        op: RedirectOp::Truncate,
        target,
    } = &cmd.redirects[0]
    else {
        return;
    };

    let target = target.as_ref().clone();
    cmd.args.push(Node::literal("-o"));
    cmd.args.push(target);
    cmd.redirects.clear();
}

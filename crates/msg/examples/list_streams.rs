use clap::Parser;
use outlook_msg::{cfb::directory::EntryKind, MsgFile};
use std::fs::File;

mod args;

fn main() -> anyhow::Result<()> {
    let args = args::Args::try_parse()?;

    let msg = MsgFile::open(&args.file)?;
    list_entry(&msg, msg.directory().root(), 0);

    Ok(())
}

fn list_entry(msg: &MsgFile<File>, index: u32, depth: usize) {
    let Some(entry) = msg.directory().entry(index) else {
        return;
    };

    let indent = "  ".repeat(depth);
    match entry.kind() {
        EntryKind::Stream => {
            println!("{indent}{} ({} bytes)", entry.name(), entry.size());
        }
        EntryKind::Storage | EntryKind::Root => {
            println!("{indent}{}/", entry.name());
            for &child in msg.directory().children(index) {
                list_entry(msg, child, depth + 1);
            }
        }
        EntryKind::Empty => {}
    }
}

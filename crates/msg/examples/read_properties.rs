use clap::Parser;
use outlook_msg::MsgFile;
use tracing_subscriber::EnvFilter;

mod args;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = args::Args::try_parse()?;

    let msg = MsgFile::open(&args.file)?;
    let store = msg.property_store(msg.directory().root())?;

    for (key, value) in store.iter() {
        println!("{key}: {value:?}");
    }

    if let Some(rtf) = store.rtf_body()? {
        println!("RTF Body: {} chars", rtf.len());
    }

    for warning in store.warnings() {
        println!("Warning: {warning}");
    }

    Ok(())
}

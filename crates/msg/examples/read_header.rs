use clap::Parser;
use outlook_msg::MsgFile;

mod args;

fn main() -> anyhow::Result<()> {
    let args = args::Args::try_parse()?;

    let msg = MsgFile::open(&args.file)?;
    let header = msg.header();

    println!("Major Version: {}", header.major_version());
    println!("Sector Size: {}", header.sector_size());
    println!("Mini Sector Size: {}", header.mini_sector_size());
    println!("Directory Sectors: {}", header.directory_sector_count());
    println!("FAT Sectors: {}", header.fat_sector_count());
    println!("Mini FAT Sectors: {}", header.mini_fat_sector_count());
    println!("DIFAT Sectors: {}", header.difat_sector_count());
    println!("Mini Stream Cutoff: {}", header.mini_stream_cutoff());

    for warning in msg.warnings() {
        println!("Warning: {warning}");
    }

    Ok(())
}

use bootunpack::header::BootHeader;
use bootunpack::sink::DirSink;
use bootunpack::unpack::{commit, inspect, Inspection, UnpackOptions};
use bootunpack::UnpackError;
use clap::Parser;
use std::fs::File;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "unpackbootimg", about = "Unpack an Android boot image into its segments")]
struct Cli {
    /// Boot image to unpack
    #[arg(short, long)]
    input: PathBuf,
    /// Existing directory that receives the extracted files
    #[arg(short, long, default_value = ".")]
    output: PathBuf,
    /// Page size override, in hexadecimal (e.g. 800 or 0x800)
    #[arg(short, long, value_parser = parse_hex)]
    pagesize: Option<u32>,
    /// Print the decoded header as JSON instead of BOARD_* lines
    #[arg(long)]
    json: bool,
    /// Log pipeline decisions to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut sink = DirSink::for_image(&cli.output, &cli.input).map_err(|source| {
        UnpackError::InvalidOutputTarget {
            name: cli.output.display().to_string(),
            source,
        }
    })?;

    let opts = UnpackOptions {
        page_size: cli.pagesize,
        ..UnpackOptions::default()
    };

    let mut f = File::open(&cli.input)?;
    let inspection = inspect(&mut f, &opts)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&inspection)?);
    } else {
        print_summary(&inspection);
    }

    commit(&mut f, &inspection, &mut sink)?;
    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn parse_hex(s: &str) -> Result<u32, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u32::from_str_radix(digits, 16).map_err(|e| format!("invalid hexadecimal page size '{s}': {e}"))
}

fn print_summary(insp: &Inspection) {
    let h = &insp.header;
    let m = &insp.metadata;

    if insp.magic_offset > 0 {
        println!("Android magic found at: {}", insp.magic_offset);
    }
    println!("HEADER_VERSION {}", m.legacy_dt_size.unwrap_or(m.header_version));

    let print_os = || {
        if let Some(os) = m.os {
            println!("BOARD_OS_VERSION {}", os.version);
            println!("BOARD_OS_PATCH_LEVEL {}", os.patch_level);
        }
    };

    let Some(offsets) = m.offsets else {
        println!("KERNEL_SIZE {}", h.kernel_size());
        println!("RAMDISK_SIZE {}", h.ramdisk_size());
        print_os();
        return;
    };

    println!("BOARD_KERNEL_CMDLINE {}", m.cmdline);
    println!("BOARD_KERNEL_BASE 0x{:08x}", offsets.base);
    println!("BOARD_NAME {}", m.board.as_deref().unwrap_or(""));
    println!("BOARD_PAGE_SIZE {}", m.page_size.unwrap_or(0));
    if let Some(hash) = m.hash_type {
        println!("BOARD_HASH_TYPE {hash}");
    }
    println!("BOARD_KERNEL_OFFSET 0x{:08x}", offsets.kernel);
    println!("BOARD_RAMDISK_OFFSET 0x{:08x}", offsets.ramdisk);
    println!("BOARD_SECOND_OFFSET 0x{:08x}", offsets.second);
    println!("BOARD_TAGS_OFFSET 0x{:08x}", offsets.tags);
    print_os();

    if let Some(dt_size) = m.legacy_dt_size {
        println!("BOARD_DT_SIZE {dt_size}");
        return;
    }
    println!("BOARD_HEADER_VERSION {}", m.header_version);
    print_extensions(h, offsets.dtb);
}

fn print_extensions(h: &BootHeader, dtb_offset: Option<u64>) {
    if h.header_version() > 0 {
        if h.recovery_dtbo_size() != 0 {
            println!("BOARD_RECOVERY_DTBO_SIZE {}", h.recovery_dtbo_size());
            println!("BOARD_RECOVERY_DTBO_OFFSET {}", h.recovery_dtbo_offset());
        }
        println!("BOARD_HEADER_SIZE {}", h.header_size().unwrap_or(0));
    }
    if let Some(dtb) = dtb_offset.filter(|_| h.dtb_size() != 0) {
        println!("BOARD_DTB_SIZE {}", h.dtb_size());
        println!("BOARD_DTB_OFFSET 0x{dtb:08x}");
    }
}

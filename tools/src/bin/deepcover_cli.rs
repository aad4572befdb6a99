use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressIterator, ProgressStyle};
use libdeepcover::eh_delay::DelayNs;
use libdeepcover::eh_i2c::SevenBitAddress;
use libdeepcover::memory::{PAGE_COUNT, page_index};
use libdeepcover::{AuthorityType, Config, DeepCover, PageRole, ProtectionFlags, ResultCode, Transport};
use sha2::{Digest, Sha256};

#[cfg(not(any(feature = "linux", feature = "ftdi")))]
compile_error!("enable the `linux` or `ftdi` feature");

#[derive(Parser)]
#[command(version, about = "DS28C36 DeepCover secure authenticator tool")]
struct Cli {
    /// I2C bus device
    #[cfg(feature = "linux")]
    #[arg(short, long, default_value = "/dev/i2c-1")]
    bus: PathBuf,

    /// Use the FTDI interface with this description instead of a Linux bus
    #[cfg(feature = "ftdi")]
    #[arg(long)]
    ftdi: Option<String>,

    /// 7-bit device address
    #[arg(short, long, default_value = "0x1B", value_parser = parse_address)]
    address: SevenBitAddress,

    /// Increase log verbosity (-v info, -vv debug, -vvv bus traces)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and validate the ROM ID
    Id,
    /// Read one page
    ReadPage { page: i64 },
    /// Write 32 bytes (64 hex characters) to a page
    WritePage { page: i64, data: String },
    /// Show the protection flags of a page
    Protection { page: i64 },
    /// Set protection flags on a page (one-way!)
    SetProtection {
        page: i64,
        /// Flag names, e.g. READ_PROTECT WRITE_PROTECT
        #[arg(required = true)]
        flags: Vec<String>,
    },
    /// Read the scratch buffer
    ReadBuffer {
        #[arg(default_value_t = 0)]
        len: usize,
    },
    /// Load the scratch buffer
    WriteBuffer { data: String },
    /// Read bytes from the device RNG
    Random {
        #[arg(default_value_t = 32)]
        len: usize,
    },
    /// Decrement the one-way counter in page 27
    Decrement,
    /// Compute and read page authentication
    Auth {
        #[arg(value_enum)]
        authority: Authority,
        page: i64,
        /// 32-byte challenge as hex, random from the device if omitted
        challenge: Option<String>,
    },
    /// Sign the SHA-256 of a message with private key A and check it against public key A
    Sign { message: String },
    /// Read all pages with role and protection
    Dump {
        /// Also write the raw page contents to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Authority {
    HmacA,
    HmacB,
    HmacS,
    EcdsaA,
    EcdsaB,
    EcdsaC,
}

impl From<Authority> for AuthorityType {
    fn from(value: Authority) -> Self {
        match value {
            Authority::HmacA => AuthorityType::HmacSecretA,
            Authority::HmacB => AuthorityType::HmacSecretB,
            Authority::HmacS => AuthorityType::HmacSecretS,
            Authority::EcdsaA => AuthorityType::EcdsaKeyA,
            Authority::EcdsaB => AuthorityType::EcdsaKeyB,
            Authority::EcdsaC => AuthorityType::EcdsaKeyC,
        }
    }
}

fn parse_address(s: &str) -> Result<SevenBitAddress> {
    let value = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16)?,
        None => s.parse()?,
    };
    if value > 0x7F {
        bail!("{s} is not a 7-bit address");
    }
    Ok(value)
}

fn parse_hex<const N: usize>(s: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(s)?;
    bytes
        .as_slice()
        .try_into()
        .map_err(|_| anyhow!("expected {N} bytes, got {}", bytes.len()))
}

fn check_result(result: ResultCode) -> Result<()> {
    if result.is_success() {
        Ok(())
    } else {
        bail!("device returned {result}")
    }
}

fn describe(flags: ProtectionFlags) -> String {
    if flags.is_empty() {
        return "none".into();
    }
    flags.iter_names().map(|(name, _)| name).collect::<Vec<_>>().join(" | ")
}

fn run<T: Transport, D: DelayNs>(dc: &mut DeepCover<T, D>, command: Commands) -> Result<()> {
    match command {
        Commands::Id => {
            let identity = dc.get_identity(true)?;
            println!("ROM ID: {}", hex::encode_upper(identity.rom_id));
            println!("MANID:  {}", hex::encode_upper(identity.man_id));
            println!("CRC:    {}", if identity.crc_valid { "ok" } else { "FAILED" });
            println!("Family: {:#04X}{}", identity.family_code(), if identity.family_valid { "" } else { " (unexpected)" });
            if !identity.is_valid() {
                bail!("ROM ID did not validate");
            }
        }
        Commands::ReadPage { page } => {
            let page = page_index(page)?;
            let data = dc.read_page(page)?;
            println!("{}", hex::encode_upper(data));
        }
        Commands::WritePage { page, data } => {
            let page = page_index(page)?;
            let data: [u8; 32] = parse_hex(&data)?;
            check_result(dc.write_page(page, &data)?)?;
            println!("Page {page} written");
        }
        Commands::Protection { page } => {
            let page = page_index(page)?;
            let raw = dc.read_page_protection_raw(page)?;
            println!("Page {page}: {:#04X} ({})", raw.bits(), describe(raw.effective(page)));
        }
        Commands::SetProtection { page, flags } => {
            let page = page_index(page)?;
            let flags = flags.iter().try_fold(ProtectionFlags::empty(), |acc, name| {
                ProtectionFlags::from_name(name)
                    .map(|flag| acc | flag)
                    .ok_or_else(|| anyhow!("unknown protection flag {name}"))
            })?;
            check_result(dc.set_page_protection(page, flags)?)?;
            println!("Page {page}: set {}", describe(flags));
        }
        Commands::ReadBuffer { len } => {
            println!("{}", hex::encode_upper(dc.read_buffer(len)?));
        }
        Commands::WriteBuffer { data } => {
            let data = hex::decode(data)?;
            let written = dc.write_buffer(&data)?;
            println!("{written} bytes loaded");
        }
        Commands::Random { len } => {
            println!("{}", hex::encode_upper(dc.read_random(len)?));
        }
        Commands::Decrement => {
            check_result(dc.decrement_counter()?)?;
            println!("Counter decremented");
        }
        Commands::Auth { authority, page, challenge } => {
            let page = page_index(page)?;
            let challenge: [u8; 32] = match challenge {
                Some(text) => parse_hex(&text)?,
                None => dc
                    .read_random(32)?
                    .as_slice()
                    .try_into()
                    .context("short random read")?,
            };
            println!("Challenge: {}", hex::encode_upper(challenge));

            let auth = dc.authenticate(&challenge, authority.into(), page)?;
            check_result(auth.result)?;
            println!("{:?}: {}", auth.authority, hex::encode_upper(auth.output_bytes()));
        }
        Commands::Sign { message } => {
            let digest: [u8; 32] = Sha256::digest(message.as_bytes()).into();
            println!("SHA-256: {}", hex::encode_upper(digest));

            let auth = dc.sign_digest(&digest)?;
            check_result(auth.result)?;
            let signature = auth.signature().context("no signature in response")?;
            println!("R: {}", hex::encode_upper(signature.r));
            println!("S: {}", hex::encode_upper(signature.s));

            if dc.verify_authentication(&digest, &auth)? {
                println!("Signature verified with public key A");
            } else {
                bail!("signature did not verify against public key A");
            }
        }
        Commands::Dump { output } => {
            let style = ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos} / {len} pages")?;

            let mut pages = Vec::with_capacity(PAGE_COUNT);
            for page in (0..PAGE_COUNT as u8).progress_with_style(style) {
                let flags = dc.read_page_protection(page)?;
                let data = if flags.contains(ProtectionFlags::READ_PROTECT) {
                    None
                } else {
                    Some(dc.read_page(page)?)
                };
                pages.push((page, flags, data));
            }

            let mut file = output.map(File::create).transpose()?;
            for (page, flags, data) in pages {
                let role = PageRole::of(page).unwrap_or(PageRole::Unused);
                println!("{page:2} {:<14} {}", role.name(), describe(flags));
                match data {
                    Some(data) => {
                        println!("   {}", hex::encode_upper(data));
                        if let Some(file) = file.as_mut() {
                            file.write_all(&data)?;
                        }
                    }
                    None => {
                        println!("   <read protected>");
                        if let Some(file) = file.as_mut() {
                            file.write_all(&[0xFF; 32])?;
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::Level::Warn,
        1 => log::Level::Info,
        2 => log::Level::Debug,
        _ => log::Level::Trace,
    };
    simple_logger::init_with_level(level)?;

    let config = Config::with_address(cli.address);

    #[cfg(feature = "ftdi")]
    if let Some(description) = cli.ftdi.as_deref() {
        let mut dc = libdeepcover::FtdiDeepCover::open_ftdi(description, Default::default(), &config)?;
        return run(&mut dc, cli.command);
    }

    #[cfg(feature = "linux")]
    let mut dc = libdeepcover::LinuxDeepCover::open(&cli.bus, &config)?;
    #[cfg(feature = "linux")]
    return run(&mut dc, cli.command);

    #[cfg(not(feature = "linux"))]
    bail!("no bus selected, pass --ftdi <description>");
}

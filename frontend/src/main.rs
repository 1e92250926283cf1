use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use chip8_core::{
    disassemble, Chip8Builder, Framebuffer, Mode, Palette, Rgb, Step, PROGRAM_START,
    SCREEN_HEIGHT, SCREEN_WIDTH,
};
use clap::{Parser, ValueEnum};
use log::{info, warn};

const TIMER_HZ: u32 = 60;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    CosmacVip,
    Chip48,
    SuperChip,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Mode {
        match mode {
            ModeArg::CosmacVip => Mode::CosmacVip,
            ModeArg::Chip48 => Mode::Chip48,
            ModeArg::SuperChip => Mode::SuperChip,
        }
    }
}

/// Headless CHIP-8 runner
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Filepath to Chip-8 ROM file that will be executed
    #[clap(index = 1)]
    rom: PathBuf,

    /// Filepath to an 80 byte font file
    #[clap(long)]
    font: Option<PathBuf>,

    /// Interpreter quirks to emulate
    #[clap(long, value_enum)]
    mode: Option<ModeArg>,

    /// Instructions per second
    #[clap(short, long, default_value_t = 700)]
    ips: u32,

    /// Number of instructions to execute before exiting
    #[clap(short, long, default_value_t = 3000)]
    cycles: u64,

    /// Run as fast as possible instead of pacing to --ips
    #[clap(long)]
    turbo: bool,

    /// Hex keys (0-F) held down for the whole run
    #[clap(long, value_parser = parse_key, value_delimiter = ',')]
    hold: Vec<u8>,

    /// PRNG seed
    #[clap(long)]
    seed: Option<u64>,

    /// Print the ROM listing and exit
    #[clap(long)]
    disassemble: bool,

    /// Write the final frame as a binary PPM image
    #[clap(long)]
    ppm: Option<PathBuf>,

    /// Background Color as HEX 0xAABBFF [default: 0x000000]
    #[clap(long)]
    background: Option<Rgb>,

    /// Foreground Color as HEX 0xAABBFF [default: 0xFFFFFF]
    #[clap(long)]
    foreground: Option<Rgb>,

    /// Trace every executed instruction
    #[clap(short, long)]
    debug: bool,
}

fn parse_key(s: &str) -> Result<u8, String> {
    match u8::from_str_radix(s.trim_start_matches("0x"), 16) {
        Ok(key) if key < 16 => Ok(key),
        _ => Err(format!("{:?} is not a hex key between 0 and F", s)),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.debug { "trace" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if args.ips == 0 || args.ips > 1_000_000 {
        bail!("Instructions per second must be between [1-1000000]");
    }

    let rom = std::fs::read(&args.rom)
        .with_context(|| format!("Failed to read ROM file {}", args.rom.display()))?;

    if args.disassemble {
        print_listing(&rom);
        return Ok(());
    }

    let mut builder = Chip8Builder::new().with_rom(rom);

    if let Some(font) = &args.font {
        let font_data = std::fs::read(font)
            .with_context(|| format!("Failed to read font file {}", font.display()))?;
        builder = builder.with_font(font_data);
    }

    if let Some(mode) = args.mode {
        builder = builder.with_mode(mode.into());
    }

    if let Some(seed) = args.seed {
        builder = builder.with_rng_seed(seed);
    }

    let mut chip = builder.build().context("Failed to load ROM")?;

    for &key in &args.hold {
        chip.machine_mut().set_key(key, true);
    }

    // Timers follow the instruction count rather than the wall clock so runs are reproducible
    let delta_update = Duration::new(0, 1_000_000_000u32 / args.ips);
    let mut next_update = Instant::now();
    let mut frames = 0u64;
    let mut beeping = false;

    for cycle in 0..args.cycles {
        if !args.turbo {
            // Wait until next update
            let now = Instant::now();
            if let Some(delay) = next_update.checked_duration_since(now) {
                std::thread::sleep(delay);
            }
            next_update += delta_update;
        }

        for _ in 0..timer_ticks_due(cycle, args.ips) {
            chip.tick_timers();
        }

        if let Step::Fault(fault) = chip.step() {
            warn!("cycle {}: {}", cycle, fault);
        }

        let sound = chip.machine().sound_active();
        if sound != beeping {
            info!("cycle {}: tone {}", cycle, if sound { "on" } else { "off" });
            beeping = sound;
        }

        if chip.machine_mut().framebuffer_mut().take_draw_pending() {
            frames += 1;
        }
    }

    info!(
        "ran {} instructions, {} frames, {} faults",
        args.cycles,
        frames,
        chip.fault_count()
    );

    print_frame(chip.machine().framebuffer());

    if let Some(path) = &args.ppm {
        let palette = Palette {
            foreground: args.foreground.unwrap_or(Palette::default().foreground),
            background: args.background.unwrap_or(Palette::default().background),
        };
        write_ppm(path, chip.machine().framebuffer(), &palette)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(())
}

/// Timer ticks owed before instruction `cycle` at `ips` instructions per second.
fn timer_ticks_due(cycle: u64, ips: u32) -> u64 {
    let ips = u64::from(ips);
    let hz = u64::from(TIMER_HZ);
    (cycle + 1) * hz / ips - cycle * hz / ips
}

fn print_listing(rom: &[u8]) {
    for (addr, word, inst) in disassemble(rom, PROGRAM_START) {
        match inst {
            Some(inst) => println!("{:03x}: {:04x}  {}", addr, word, inst),
            None => println!("{:03x}: {:04x}  DW {:#06x}", addr, word, word),
        }
    }
}

fn print_frame(fb: &Framebuffer) {
    for y in 0..SCREEN_HEIGHT {
        let line: String = (0..SCREEN_WIDTH)
            .map(|x| if fb.pixel(x, y) { '█' } else { ' ' })
            .collect();
        println!("{}", line.trim_end());
    }
}

fn write_ppm(path: &Path, fb: &Framebuffer, palette: &Palette) -> Result<()> {
    let pixels = fb.to_rgb(palette);
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "P6\n{} {}\n255\n", SCREEN_WIDTH, SCREEN_HEIGHT)?;
    out.write_all(bytemuck::cast_slice(&pixels))?;
    out.flush()?;
    Ok(())
}

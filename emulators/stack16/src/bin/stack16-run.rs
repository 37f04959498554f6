use anyhow::{bail, Context};
use clap::Parser;
use log::{LevelFilter, Log, Metadata, Record};
use stack16::{Bus, Cpu, EngineConfig, Memory, Opcode, Register};
use std::env;
use std::fs;
use std::path::PathBuf;

const TRACE_ENV: &str = "STACK16_TRACE";
const LOG_ENV: &str = "STACK16_LOG";

#[derive(Parser, Debug)]
#[command(
    name = "stack16-run",
    about = "Load a raw stack16 program image and step the engine."
)]
struct Args {
    /// Raw program image (bytes exactly as executed).
    program: PathBuf,

    /// Size of the flat memory in bytes; the stack starts at its top word.
    #[arg(long, default_value_t = 0x1_0000)]
    memory_size: usize,

    /// Address the image is copied to (hex or decimal).
    #[arg(long, value_name = "ADDR", default_value = "0", value_parser = parse_address)]
    load_addr: u32,

    /// Number of instructions to execute before exiting.
    #[arg(long, default_value_t = 64)]
    steps: u64,

    /// Fail on bytes that are not in the opcode table instead of skipping them.
    #[arg(long, default_value_t = false)]
    strict_opcodes: bool,

    /// Print all registers after running.
    #[arg(long, default_value_t = false)]
    dump_regs: bool,

    /// Print a memory window starting at this address after running.
    #[arg(long, value_name = "ADDR", value_parser = parse_address)]
    dump_mem: Option<u32>,

    /// Number of bytes shown by --dump-mem.
    #[arg(long, value_name = "N", default_value_t = 16)]
    dump_len: usize,

    /// Print the final machine state as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn parse_address(raw: &str) -> Result<u32, String> {
    let trimmed = raw.trim();
    let parsed = match trimmed.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => trimmed.parse::<u32>(),
    };
    parsed.map_err(|err| format!("invalid address '{raw}': {err}"))
}

/// Writes library `log` records at or above `level` to stderr.
struct StderrLogger {
    level: LevelFilter,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

/// `STACK16_LOG` takes a level name (`debug`, `trace`, ...); `1`/`true` mean `trace`.
fn parse_log_level(raw: &str) -> Result<LevelFilter, String> {
    match raw.trim() {
        "1" | "true" | "True" => Ok(LevelFilter::Trace),
        "" | "0" | "false" | "False" => Ok(LevelFilter::Off),
        other => other
            .parse()
            .map_err(|_| format!("invalid {LOG_ENV} level '{other}'")),
    }
}

fn install_logger() -> anyhow::Result<()> {
    let Ok(raw) = env::var(LOG_ENV) else {
        return Ok(());
    };
    let level = parse_log_level(&raw).map_err(anyhow::Error::msg)?;
    if level == LevelFilter::Off {
        return Ok(());
    }
    log::set_boxed_logger(Box::new(StderrLogger { level })).context("install logger")?;
    log::set_max_level(level);
    Ok(())
}

fn env_enabled(name: &str) -> bool {
    matches!(env::var(name).as_deref(), Ok("1") | Ok("true") | Ok("True"))
}

fn run(args: Args) -> anyhow::Result<()> {
    install_logger()?;
    let trace = env_enabled(TRACE_ENV);

    let image = fs::read(&args.program)
        .with_context(|| format!("read program {}", args.program.display()))?;
    if args.memory_size < 2 {
        bail!("memory must hold at least one word, got {} bytes", args.memory_size);
    }
    let mut memory = Memory::new(args.memory_size);
    memory
        .load(args.load_addr, &image)
        .context("program does not fit in memory")?;

    let config = if args.strict_opcodes {
        EngineConfig::strict()
    } else {
        EngineConfig::from_env()
    };
    let mut cpu = Cpu::with_config(memory, config);
    cpu.set_reg(Register::Ip, args.load_addr as u16);

    for executed in 0..args.steps {
        if trace {
            let ip = cpu.reg(Register::Ip);
            let mnemonic = cpu
                .memory()
                .read_byte(ip as u32)
                .ok()
                .and_then(Opcode::from_byte)
                .map_or("??", Opcode::mnemonic);
            eprintln!("[step {executed}] ip=0x{ip:04X} {mnemonic}");
        }
        cpu.step()
            .with_context(|| format!("step {executed} failed\n{}", cpu.register_dump()))?;
    }

    if args.dump_regs {
        println!("{}", cpu.register_dump());
    }
    if let Some(addr) = args.dump_mem {
        println!("{}", cpu.memory_window(addr, args.dump_len)?);
    }
    if args.json {
        serde_json::to_writer_pretty(std::io::stdout(), &cpu.snapshot())?;
        println!();
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("fatal: {err:#}");
        std::process::exit(1);
    }
}

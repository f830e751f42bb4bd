//! NumVault CLI Client
//!
//! Command-line interface for exercising the NumVault protocol.

use clap::{Parser, Subcommand};
use numvault::math::ArithOp;
use numvault::protocol::{Arg, Client};
use numvault::Status;

/// NumVault CLI
#[derive(Parser, Debug)]
#[command(name = "numvault-cli")]
#[command(about = "CLI client for the NumVault server")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "localhost:8912")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a variable's numeric value (resolving alias chains)
    Get {
        /// The variable to read
        name: String,

        /// Fail on alias entries instead of resolving through them
        #[arg(long)]
        no_recursive: bool,
    },

    /// Store a numeric value under a variable name
    Set {
        name: String,
        value: i64,
    },

    /// Arithmetic over literals or variables (stored if --store is given)
    Arith {
        /// add, sub, mul, div, or mod
        op: String,

        /// Left operand: integer literal or variable name
        a: String,

        /// Right operand: integer literal or variable name
        b: String,

        /// Store the result under this variable name
        #[arg(long)]
        store: Option<String>,
    },

    /// Show the target of an alias
    GetAlias { name: String },

    /// Point one variable at another
    SetAlias { name: String, target: String },

    /// Delete a variable
    Del { name: String },

    /// Read bytes from a server-side file
    Read {
        file: String,
        size: u16,
        #[arg(default_value = "0")]
        offset: u64,
    },

    /// Write a string to a server-side file
    Write {
        file: String,
        offset: u64,
        data: String,
    },

    /// Create a server-side file
    Create { file: String },

    /// Report a server-side file's size
    Size { file: String },

    /// Dump the variable store to a new server-side file
    Dump { file: String },

    /// Load a dump file into the variable store
    Load { file: String },

    /// Clear the variable store and its log
    Clear,
}

fn operand(raw: &str) -> Arg {
    match raw.parse::<i64>() {
        Ok(v) => Arg::Literal(v),
        Err(_) => Arg::Name(raw.to_string()),
    }
}

fn fail(status: u8) -> ! {
    eprintln!("error: {} (status {})", Status::describe(status), status);
    std::process::exit(1);
}

fn main() {
    let args = Args::parse();

    let mut client = match Client::connect(&args.server) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: cannot connect to {}: {}", args.server, e);
            std::process::exit(1);
        }
    };

    let result = run(&mut client, args.command);
    if let Err(e) = result {
        eprintln!("error: connection failed: {}", e);
        std::process::exit(1);
    }
}

fn run(client: &mut Client, command: Commands) -> std::io::Result<()> {
    match command {
        Commands::Get {
            name,
            no_recursive,
        } => match client.get_value(&name, !no_recursive)? {
            Ok(value) => println!("{}", value),
            Err(status) => fail(status),
        },
        Commands::Set { name, value } => match client.set_value(&name, value)? {
            Ok(stored) => println!("{} = {}", name, stored),
            Err(status) => fail(status),
        },
        Commands::Arith { op, a, b, store } => {
            let op = match op.as_str() {
                "add" => ArithOp::Add,
                "sub" => ArithOp::Sub,
                "mul" => ArithOp::Mul,
                "div" => ArithOp::Div,
                "mod" => ArithOp::Rem,
                other => {
                    eprintln!("error: unknown operation '{}'", other);
                    std::process::exit(1);
                }
            };
            match client.arith(op, operand(&a), operand(&b), store.as_deref(), true)? {
                Ok(value) => println!("{}", value),
                Err(status) => fail(status),
            }
        }
        Commands::GetAlias { name } => match client.get_alias(&name)? {
            Ok(target) => println!("{} -> {}", name, target),
            Err(status) => fail(status),
        },
        Commands::SetAlias { name, target } => match client.set_alias(&name, &target)? {
            Ok(()) => println!("{} -> {}", name, target),
            Err(status) => fail(status),
        },
        Commands::Del { name } => match client.delete(&name)? {
            Ok(()) => println!("deleted {}", name),
            Err(status) => fail(status),
        },
        Commands::Read { file, size, offset } => match client.file_read(&file, offset, size)? {
            Ok(data) => {
                use std::io::Write;
                std::io::stdout().write_all(&data)?;
            }
            Err(status) => fail(status),
        },
        Commands::Write { file, offset, data } => {
            match client.file_write(&file, offset, data.as_bytes())? {
                Ok(()) => println!("wrote {} bytes", data.len()),
                Err(status) => fail(status),
            }
        }
        Commands::Create { file } => match client.file_create(&file)? {
            Ok(()) => println!("created {}", file),
            Err(status) => fail(status),
        },
        Commands::Size { file } => match client.file_size(&file)? {
            Ok(size) => println!("{}", size),
            Err(status) => fail(status),
        },
        Commands::Dump { file } => match client.dump(&file)? {
            Ok(()) => println!("dumped to {}", file),
            Err(status) => fail(status),
        },
        Commands::Load { file } => match client.load(&file)? {
            Ok(()) => println!("loaded {}", file),
            Err(status) => fail(status),
        },
        Commands::Clear => match client.clear(None)? {
            Ok(()) => println!("store cleared"),
            Err(status) => fail(status),
        },
    }

    Ok(())
}

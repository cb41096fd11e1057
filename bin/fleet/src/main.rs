//! `fleet` CLI: deploys, funds and drains a batch of byte-distinct contract variants.

use clap::Parser;
use fleet::{Error, MainCmd};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    set_thread_panic_hook();
    load_dotenv()?;
    MainCmd::parse().run().await.inspect_err(|e| eprintln!("{e}"))
}

/// Loads `.env` from the working directory. A missing file is not an error.
fn load_dotenv() -> Result<(), Error> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err.into()),
    }
}

/// Sets thread panic hook, useful for having tests that panic.
fn set_thread_panic_hook() {
    use std::{
        backtrace::Backtrace,
        panic::{set_hook, take_hook},
        process::exit,
    };
    let orig_hook = take_hook();
    set_hook(Box::new(move |panic_info| {
        eprintln!("Custom backtrace: {}", Backtrace::capture());
        orig_hook(panic_info);
        exit(1);
    }));
}

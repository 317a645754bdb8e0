//! Field injection into `SomeBean`, before and after.
//!
//! ```text
//! RUST_LOG=haqn_core=debug cargo run -p haqn --example demo
//! ```

use std::fmt::Debug;
use std::io::{self, Write};

use haqn::{Injectable, Injector, PropertiesText, contract, implementation};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PROPERTIES: &str = include_str!("config.properties");

#[contract(name = "org.example.SomeInterface")]
pub trait SomeInterface: Debug {
    fn do_something(&self, out: &mut dyn Write) -> io::Result<()>;
}

#[contract(name = "org.example.SomeOtherInterface")]
pub trait SomeOtherInterface: Debug {
    fn do_some_other(&self, out: &mut dyn Write) -> io::Result<()>;
}

#[derive(Debug, Default)]
pub struct SomeImpl;

#[implementation(name = "org.example.SomeImpl")]
impl SomeInterface for SomeImpl {
    fn do_something(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "A")
    }
}

#[derive(Debug, Default)]
pub struct OtherImpl;

#[implementation(name = "org.example.OtherImpl")]
impl SomeInterface for OtherImpl {
    fn do_something(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "B")
    }
}

#[derive(Debug, Default)]
pub struct SODoer;

#[implementation(name = "org.example.SODoer")]
impl SomeOtherInterface for SODoer {
    fn do_some_other(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "C")
    }
}

#[derive(Debug, Default, Injectable)]
pub struct SomeBean {
    #[inject]
    field1: Option<Box<dyn SomeInterface>>,
    #[inject]
    field2: Option<Box<dyn SomeOtherInterface>>,
}

impl SomeBean {
    pub fn foo(&self, out: &mut dyn Write) -> io::Result<()> {
        match &self.field1 {
            Some(field1) => field1.do_something(out)?,
            None => writeln!(out, "field1 is null!")?,
        }
        match &self.field2 {
            Some(field2) => field2.do_some_other(out)?,
            None => writeln!(out, "field2 is null!")?,
        }
        Ok(())
    }

    fn describe(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "   field1: {:?}", self.field1)?;
        writeln!(out, "   field2: {:?}", self.field2)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let stdout = io::stdout();
    let mut out = stdout.lock();

    writeln!(out, "1. Without injection")?;
    let bean = SomeBean::default();
    bean.describe(&mut out)?;
    write!(out, "foo(): ")?;
    bean.foo(&mut out)?;

    writeln!(out, "\n2. With an Injector")?;
    let injector = Injector::builder()
        .config(PropertiesText::new("config.properties", PROPERTIES))
        .build()?;

    let mut bean = SomeBean::default();
    let bean = injector.inject(&mut bean)?;
    info!(bindings = injector.bindings().len(), "SomeBean injected");
    bean.describe(&mut out)?;
    write!(out, "foo(): ")?;
    bean.foo(&mut out)?;

    Ok(())
}

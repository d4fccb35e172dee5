//! Run command implementation.
//!
//! Executes code once against a [`MemoryHost`]. With `--create` the code is
//! run as init code first and its output is executed as the deployed code.
//! With `--bench` the final execution is repeated for about a second and the
//! average time per execution is reported.

use std::time::{Duration, Instant};

use anyhow::Context;
use qrvmc_bridge::{Address, CallKind, ExecutionMessage, LibraryResolver, Revision, VmInstance};

use crate::host::{Account, MemoryHost};

pub const DEFAULT_GAS: i64 = 1_000_000;

/// Wall time a benchmark aims to fill.
const BENCH_TARGET: Duration = Duration::from_secs(1);

const SENDER: Address = Address { bytes: [0; 20] };
const RECIPIENT: Address = Address {
    bytes: [
        0xc9, 0xea, 0x7e, 0xd0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0x01,
    ],
};

pub struct RunOptions {
    pub code: Vec<u8>,
    pub input: Vec<u8>,
    pub gas: i64,
    pub revision: Option<i32>,
    pub create: bool,
    pub bench: bool,
}

/// Decode a hex argument, accepting an optional `0x` prefix and surrounding whitespace.
pub fn decode_hex(what: &str, text: &str) -> anyhow::Result<Vec<u8>> {
    let text = text.trim();
    let text = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(text).with_context(|| format!("invalid hex in {}", what))
}

pub fn execute(
    resolver: &LibraryResolver,
    config: &str,
    options: &RunOptions,
) -> anyhow::Result<()> {
    let vm = resolver.create_configured(config)?;
    let revision = options
        .revision
        .map(Revision::from_raw)
        .unwrap_or_default();

    let outcome = run(&vm, revision, options);
    vm.destroy()?;
    outcome
}

fn run(vm: &VmInstance, revision: Revision, options: &RunOptions) -> anyhow::Result<()> {
    println!(
        "Executing on revision {} with {} gas limit",
        revision.as_raw(),
        options.gas
    );

    let mut host = MemoryHost::new();
    let mut code = options.code.clone();

    if options.create {
        let message =
            ExecutionMessage::call(SENDER, RECIPIENT, options.gas).with_kind(CallKind::Create);
        let result = vm.execute(&mut host, revision, &message, &code)?;
        let gas_used = gas_used(options.gas, result.gas_left());

        if !result.status().is_success() {
            println!("Contract creation failed: {}", result.status());
            println!("Gas used: {}", gas_used);
            println!("Output: {}", hex::encode(result.output()));
            return Ok(());
        }

        println!("Creation gas used: {}", gas_used);
        code = result.into_output();
    }

    host = host.with_account(
        RECIPIENT,
        Account {
            code: code.clone(),
            ..Default::default()
        },
    );

    let message =
        ExecutionMessage::call(SENDER, RECIPIENT, options.gas).with_input(options.input.clone());

    if options.bench {
        bench(vm, &host, revision, &message, &code)?;
    }

    let result = vm.execute(&mut host, revision, &message, &code)?;

    tracing::debug!(
        "Host saw {} call(s) and {} log(s)",
        host.calls.len(),
        host.logs.len()
    );
    for log in &host.logs {
        tracing::debug!(
            "Log from 0x{}: data 0x{}, {} topic(s)",
            hex::encode(log.address.bytes),
            hex::encode(&log.data),
            log.topics.len()
        );
    }

    println!();
    println!("Result:   {}", result.status());
    println!("Gas used: {}", gas_used(options.gas, result.gas_left()));
    println!("Output:   {}", hex::encode(result.output()));

    Ok(())
}

fn gas_used(gas: i64, gas_left: i64) -> i64 {
    gas.saturating_sub(gas_left)
}

/// Number of executions that fill the benchmark target, given one sample.
fn bench_iterations(sample: Duration) -> u32 {
    let sample = sample.as_nanos().max(1);
    (BENCH_TARGET.as_nanos() / sample).clamp(1, u32::MAX as u128) as u32
}

/// Time repeated executions of `message`, each against a fresh copy of `host`.
fn bench(
    vm: &VmInstance,
    host: &MemoryHost,
    revision: Revision,
    message: &ExecutionMessage,
    code: &[u8],
) -> anyhow::Result<()> {
    let start = Instant::now();
    vm.execute(&mut host.clone(), revision, message, code)?;
    let iterations = bench_iterations(start.elapsed());
    tracing::debug!("Benchmarking {} iteration(s)", iterations);

    let mut total = Duration::ZERO;
    for _ in 0..iterations {
        let mut bench_host = host.clone();
        let start = Instant::now();
        vm.execute(&mut bench_host, revision, message, code)?;
        total += start.elapsed();
    }

    let average = total / iterations;
    println!(
        "Time:     {}us (avg of {} iterations)",
        average.as_micros(),
        iterations
    );
    Ok(())
}

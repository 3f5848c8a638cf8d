// WireBridge - Peripheral-to-Component Simulation Bridge
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use tracing::{error, info};

use wirebridge_config::{
    BridgeConfig, Diagram, Stimulus, StimulusAssertion, StimulusScript, CONTROLLER_PREFIX,
};
use wirebridge_core::audio::{BuzzerAudio, SilentSink};
use wirebridge_core::components::{ComponentKind, ComponentSet, VirtualElement};
use wirebridge_core::connection::extract_connections;
use wirebridge_core::shift_register::clock_out_sequence;
use wirebridge_core::system::atmega328p::AvrIo;
use wirebridge_core::{connect_diagram, BridgeConnections, IoPort, Port};

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(author, version, about = "WireBridge component bridge runner", long_about = None)]
struct Cli {
    /// Log every port change and bridge decision
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a stimulus script against a diagram and check assertions.
    Run(RunArgs),

    /// Print the board connections extracted from a diagram.
    Connections(ConnectionsArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Path to the diagram (JSON)
    #[arg(short, long)]
    diagram: PathBuf,

    /// Path to the stimulus script (YAML)
    #[arg(short, long)]
    script: PathBuf,

    /// Path to the bridge configuration (YAML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the JSON report to this file
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ConnectionsArgs {
    /// Path to the diagram (JSON)
    #[arg(short, long)]
    diagram: PathBuf,
}

#[derive(Debug, Serialize)]
struct RunReport {
    result_schema_version: String,
    status: String,
    steps_executed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    assertions: Vec<AssertionResult>,
    components: BTreeMap<String, serde_json::Value>,
    tone_hz: Option<u32>,
    io: serde_json::Value,
    config: RunConfig,
}

#[derive(Debug, Serialize)]
struct AssertionResult {
    assertion: StimulusAssertion,
    passed: bool,
    actual: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct RunConfig {
    diagram: PathBuf,
    script: PathBuf,
    config: Option<PathBuf>,
}

/// Headless stand-ins for every rendered part, keyed by part id.
struct Bench {
    io: AvrIo,
    components: ComponentSet,
    elements: BTreeMap<String, Rc<RefCell<VirtualElement>>>,
}

impl Bench {
    fn new(diagram: &Diagram) -> Self {
        let mut components = ComponentSet::new();
        let mut elements = BTreeMap::new();
        for part in &diagram.parts {
            let element = VirtualElement::shared();
            components.insert(
                &part.id,
                ComponentKind::from_part_type(&part.r#type),
                element.clone(),
            );
            elements.insert(part.id.clone(), element);
        }
        Self {
            io: AvrIo::new(),
            components,
            elements,
        }
    }

    fn element(&self, id: &str) -> anyhow::Result<&Rc<RefCell<VirtualElement>>> {
        self.elements
            .get(id)
            .with_context(|| format!("No part '{}' in diagram", id))
    }

    fn apply(&self, step: &Stimulus, config: &BridgeConfig) -> anyhow::Result<()> {
        match step {
            Stimulus::WritePort(s) => {
                let port = Port::from(s.write_port.port);
                self.io
                    .write_port(port, s.write_port.value)
                    .with_context(|| format!("Writing {}", port))?;
            }
            Stimulus::WriteRegister(s) => {
                let reg = &s.write_register;
                self.io
                    .write_data(reg.address, reg.value)
                    .with_context(|| format!("Writing register {:#06x}", reg.address))?;
            }
            Stimulus::Press(s) => self.element(&s.press)?.borrow_mut().press(),
            Stimulus::Release(s) => self.element(&s.release)?.borrow_mut().release(),
            Stimulus::ShiftOut(s) => {
                let base = self.io.avr_port(Port::C).read();
                for value in clock_out_sequence(config.shift_register, base, &s.shift_out) {
                    self.io
                        .write_port(Port::C, value)
                        .context("Clocking shift register")?;
                }
            }
        }
        Ok(())
    }

    fn check(
        &self,
        assertion: &StimulusAssertion,
        bridge: &BridgeConnections,
    ) -> anyhow::Result<AssertionResult> {
        let (passed, actual) = match assertion {
            StimulusAssertion::Led(a) => {
                let lit = self.element(&a.led.id)?.borrow().lit;
                (lit == a.led.lit, serde_json::json!(lit))
            }
            StimulusAssertion::Digit(a) => {
                let digit = self.element(&a.digit.id)?.borrow().digit;
                (digit == a.digit.value, serde_json::json!(digit))
            }
            StimulusAssertion::Tone(a) => {
                let hz = bridge.tone_hz();
                (hz == a.tone.hz, serde_json::json!(hz))
            }
        };
        Ok(AssertionResult {
            assertion: assertion.clone(),
            passed,
            actual,
        })
    }

    fn component_states(&self) -> BTreeMap<String, serde_json::Value> {
        self.elements
            .iter()
            .map(|(id, element)| {
                let state = serde_json::to_value(&*element.borrow()).unwrap_or_default();
                (id.clone(), state)
            })
            .collect()
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Reports go to stdout; keep logs on stderr.
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Commands::Run(args) => run(args, cli.trace),
        Commands::Connections(args) => print_connections(args),
    }
}

fn load_inputs(args: &RunArgs) -> anyhow::Result<(Diagram, StimulusScript, BridgeConfig)> {
    let diagram = Diagram::from_file(&args.diagram)?;
    let script = StimulusScript::from_file(&args.script)?;
    let config = match &args.config {
        Some(path) => BridgeConfig::from_file(path)?,
        None => BridgeConfig::default(),
    };
    Ok((diagram, script, config))
}

/// Every component id the script refers to must exist in the diagram.
fn check_references(diagram: &Diagram, script: &StimulusScript) -> anyhow::Result<()> {
    let known = |id: &str| diagram.parts.iter().any(|p| p.id == id);
    let step_ids = script.steps.iter().filter_map(|step| match step {
        Stimulus::Press(s) => Some(s.press.as_str()),
        Stimulus::Release(s) => Some(s.release.as_str()),
        _ => None,
    });
    let assertion_ids = script.assertions.iter().filter_map(|a| match a {
        StimulusAssertion::Led(a) => Some(a.led.id.as_str()),
        StimulusAssertion::Digit(a) => Some(a.digit.id.as_str()),
        StimulusAssertion::Tone(_) => None,
    });
    for id in step_ids.chain(assertion_ids) {
        if !known(id) {
            anyhow::bail!("Script refers to unknown part '{}'", id);
        }
    }
    Ok(())
}

fn run(args: RunArgs, trace: bool) -> ExitCode {
    let (diagram, script, mut config) = match load_inputs(&args) {
        Ok(inputs) => inputs,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    if let Err(e) = check_references(&diagram, &script) {
        error!("{:#}", e);
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }
    config.trace_ports |= trace;

    let bench = Bench::new(&diagram);
    let mut bridge = connect_diagram(
        &bench.io,
        &bench.components,
        &diagram,
        BuzzerAudio::new(Box::new(SilentSink)),
        &config,
    );

    let mut steps_executed = 0;
    let mut failure = None;
    for (idx, step) in script.steps.iter().enumerate() {
        if let Err(e) = bench.apply(step, &config) {
            failure = Some(format!("Step {} failed: {:#}", idx, e));
            break;
        }
        steps_executed += 1;
    }

    let mut results = Vec::new();
    if failure.is_none() {
        for assertion in &script.assertions {
            match bench.check(assertion, &bridge) {
                Ok(result) => results.push(result),
                Err(e) => {
                    failure = Some(format!("{:#}", e));
                    break;
                }
            }
        }
    }

    let (status, code) = match &failure {
        Some(_) => ("error", EXIT_RUNTIME_ERROR),
        None if results.iter().all(|r| r.passed) => ("pass", EXIT_PASS),
        None => ("fail", EXIT_ASSERT_FAIL),
    };

    let report = RunReport {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: status.to_string(),
        steps_executed,
        message: failure,
        assertions: results,
        components: bench.component_states(),
        tone_hz: bridge.tone_hz(),
        io: bench.io.snapshot(),
        config: RunConfig {
            diagram: args.diagram.clone(),
            script: args.script.clone(),
            config: args.config.clone(),
        },
    };
    bridge.cleanup();

    if let Some(message) = &report.message {
        error!("{}", message);
    }
    info!(
        "Run {}: {} steps, {}/{} assertions passed",
        report.status,
        report.steps_executed,
        report.assertions.iter().filter(|r| r.passed).count(),
        report.assertions.len()
    );

    if let Err(e) = emit_report(&report, args.output.as_deref()) {
        error!("{:#}", e);
        return ExitCode::from(EXIT_RUNTIME_ERROR);
    }
    ExitCode::from(code)
}

fn emit_report(report: &RunReport, output: Option<&Path>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    println!("{}", json);
    if let Some(path) = output {
        std::fs::write(path, &json)
            .with_context(|| format!("Failed to write report to {:?}", path))?;
    }
    Ok(())
}

fn print_connections(args: ConnectionsArgs) -> ExitCode {
    let diagram = match Diagram::from_file(&args.diagram) {
        Ok(d) => d,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let connections = extract_connections(&diagram.connections);
    let skipped = diagram
        .controller_connections()
        .count()
        .saturating_sub(connections.len());
    info!(
        "{} board connections, {} {}* wires skipped",
        connections.len(),
        skipped,
        CONTROLLER_PREFIX
    );

    match serde_json::to_string_pretty(&connections) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::from(EXIT_PASS)
        }
        Err(e) => {
            error!("Failed to serialize connections: {}", e);
            ExitCode::from(EXIT_RUNTIME_ERROR)
        }
    }
}

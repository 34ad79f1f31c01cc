use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use kld7_frame::{
    Detection, FrameData, ParamField, RadarParameters, RawAdcFrame, RawFftFrame, Tag, Target,
};
use kld7_transport::PortSummary;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    product: Option<&'a str>,
}

pub fn print_ports(ports: &[PortSummary], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<PortOutput<'_>> = ports
                .iter()
                .map(|port| PortOutput {
                    name: &port.name,
                    kind: port.kind,
                    product: port.product.as_deref(),
                })
                .collect();
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["PORT", "TYPE", "PRODUCT"]);
            for port in ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.kind.to_string(),
                    port.product.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for port in ports {
                match &port.product {
                    Some(product) => println!("{} ({}, {product})", port.name, port.kind),
                    None => println!("{} ({})", port.name, port.kind),
                }
            }
        }
    }
}

#[derive(Serialize)]
struct ParamOutput {
    name: &'static str,
    description: &'static str,
    value: i32,
}

impl ParamOutput {
    fn new(field: &ParamField, value: i32) -> Self {
        Self {
            name: field.name,
            description: field.description,
            value,
        }
    }
}

#[derive(Serialize)]
struct ParamsOutput<'a> {
    version: &'a str,
    parameters: Vec<ParamOutput>,
}

pub fn print_params(params: &RadarParameters, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = ParamsOutput {
                version: params.version(),
                parameters: params
                    .fields()
                    .map(|(field, value)| ParamOutput::new(field, value))
                    .collect(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            println!("version: {}", params.version());
            let mut table = new_table(vec!["NAME", "VALUE", "DESCRIPTION"]);
            for (field, value) in params.fields() {
                table.add_row(vec![
                    field.name.to_string(),
                    value.to_string(),
                    field.description.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("version={}", params.version());
            for (field, value) in params.fields() {
                println!("{}={value}", field.name);
            }
        }
    }
}

pub fn print_param(field: &ParamField, value: i32, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ParamOutput::new(field, value)),
        OutputFormat::Table => {
            let mut table = new_table(vec!["NAME", "VALUE", "DESCRIPTION"]);
            table.add_row(vec![
                field.name.to_string(),
                value.to_string(),
                field.description.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}={value}", field.name),
    }
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum FrameBody<'a> {
    RawAdc(&'a RawAdcFrame),
    RawFft(&'a RawFftFrame),
    Targets(&'a [Target]),
    TrackedTarget(Option<&'a Target>),
    Detection(&'a Detection),
    Done { counter: Option<u32> },
    Other { payload_size: usize },
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    cycle: u64,
    tag: Tag,
    frame: FrameBody<'a>,
}

impl<'a> FrameBody<'a> {
    fn new(frame: &'a FrameData) -> Self {
        match frame {
            FrameData::RawAdc(data) => FrameBody::RawAdc(data),
            FrameData::RawFft(data) => FrameBody::RawFft(data),
            FrameData::Targets(targets) => FrameBody::Targets(targets),
            FrameData::TrackedTarget(target) => FrameBody::TrackedTarget(target.as_ref()),
            FrameData::Detection(detection) => FrameBody::Detection(detection),
            FrameData::Done(payload) => FrameBody::Done {
                counter: done_counter(payload),
            },
            FrameData::Other(packet) => FrameBody::Other {
                payload_size: packet.payload.len(),
            },
        }
    }
}

pub fn print_frame(cycle: u64, frame: &FrameData, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&FrameOutput {
            cycle,
            tag: frame.tag(),
            frame: FrameBody::new(frame),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CYCLE", "TAG", "DATA"]);
            table.add_row(vec![
                cycle.to_string(),
                frame.tag().to_string(),
                summarize(frame),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("cycle={cycle} tag={} {}", frame.tag(), summarize(frame));
        }
    }
}

fn done_counter(payload: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = payload.try_into().ok()?;
    Some(u32::from_le_bytes(bytes))
}

fn format_target(target: &Target) -> String {
    format!(
        "{:.2} m, {:+.2} km/h, {:+.2}°, magnitude {:.0}",
        target.distance, target.speed, target.angle, target.magnitude
    )
}

fn format_detection(detection: &Detection) -> String {
    if !detection.detection && !detection.micro_detection {
        return "no detection".to_string();
    }
    let what = if detection.detection {
        "detection"
    } else {
        "micro detection"
    };
    format!(
        "{what}, {:?}, {:?}",
        detection.side(),
        detection.direction_of_travel()
    )
    .to_lowercase()
}

pub fn summarize(frame: &FrameData) -> String {
    match frame {
        FrameData::RawAdc(data) => {
            let peak = data.channels.iter().flatten().flatten().max().copied();
            format!("raw ADC, peak sample {}", peak.unwrap_or(0))
        }
        FrameData::RawFft(data) => {
            let peak = data
                .halves
                .iter()
                .flat_map(|half| half.iter().enumerate())
                .max_by_key(|entry| *entry.1)
                .map(|(index, bin)| format!("bin {index} = {bin}"));
            format!("raw FFT, peak {}", peak.unwrap_or_else(|| "none".to_string()))
        }
        FrameData::Targets(targets) if targets.is_empty() => "no targets".to_string(),
        FrameData::Targets(targets) => targets
            .iter()
            .map(format_target)
            .collect::<Vec<_>>()
            .join("; "),
        FrameData::TrackedTarget(Some(target)) => format_target(target),
        FrameData::TrackedTarget(None) => "no tracked target".to_string(),
        FrameData::Detection(detection) => format_detection(detection),
        FrameData::Done(payload) => match done_counter(payload) {
            Some(counter) => format!("frame {counter}"),
            None => format!("<{} bytes>", payload.len()),
        },
        FrameData::Other(packet) => format!("<{} bytes>", packet.payload.len()),
    }
}

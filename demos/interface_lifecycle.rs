use std::env;
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use rnetconf::credentials::{CredentialType, EnvCredentials};
use rnetconf::device::Device;
use rnetconf::interface::{InterfaceConfig, InterfaceManager};
use rnetconf::resolver::DeviceTypeResolver;
use rnetconf::session::{Connector, RecordingConnector, SessionRecorder, SshConnector};
use rnetconf::store::JsonlDeviceTypeStore;

fn print_usage() {
    eprintln!(
        "Usage: cargo run --example interface_lifecycle -- <host> <get|get-all|create|delete> [interface] [address netmask] [--credential DEFAULT|NEXUS] [--dry-run] [--record out.jsonl]"
    );
}

struct Args {
    host: String,
    action: String,
    positional: Vec<String>,
    credential: CredentialType,
    dry_run: bool,
    record: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut args = env::args().skip(1);
    let mut positional = Vec::new();
    let mut credential = CredentialType::default();
    let mut dry_run = false;
    let mut record = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            "--credential" => {
                credential = args
                    .next()
                    .context("--credential needs a value")?
                    .parse()
                    .context("unknown credential reference")?;
            }
            "--record" => record = Some(args.next().context("--record needs a path")?),
            _ => positional.push(arg),
        }
    }
    if positional.len() < 2 {
        bail!("missing host or action");
    }
    let host = positional.remove(0);
    let action = positional.remove(0);
    Ok(Args {
        host,
        action,
        positional,
        credential,
        dry_run,
        record,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{err}");
            print_usage();
            process::exit(2);
        }
    };

    let recorder = SessionRecorder::default();
    let ssh: Arc<dyn Connector> = Arc::new(SshConnector::default());
    let connector: Arc<dyn Connector> = if args.record.is_some() {
        Arc::new(RecordingConnector::new(ssh, recorder.clone()))
    } else {
        ssh
    };

    let store = Arc::new(JsonlDeviceTypeStore::new("device_types.jsonl"));
    let resolver = DeviceTypeResolver::new(store, connector.clone());
    let manager = InterfaceManager::new(connector);

    let device = Device::resolve(&args.host, args.credential.as_str(), &EnvCredentials, &resolver)
        .await
        .with_context(|| format!("resolving {}", args.host))?;
    println!("{} is {}", device.host(), device.device_family());

    let interface = args.positional.first().cloned();
    match (args.action.as_str(), interface) {
        ("get", Some(name)) => {
            let response = manager.get_one(&device, &name).await?;
            println!("{:#}", response.data);
        }
        ("get-all", _) => {
            let response = manager.get_all(&device).await?;
            println!("{:#}", response.data);
        }
        ("create", Some(name)) => {
            let (Some(address), Some(netmask)) = (args.positional.get(1), args.positional.get(2))
            else {
                bail!("create needs an address and a netmask");
            };
            let config = InterfaceConfig::new(&name, address, netmask);
            let outcome = manager.create(&device, &config, args.dry_run).await?;
            println!("{}", outcome.detail());
        }
        ("delete", Some(name)) => {
            let outcome = manager.delete(&device, &name, args.dry_run).await?;
            println!("{}", outcome.detail());
        }
        (action, _) => {
            print_usage();
            bail!("unsupported action {action} or missing interface name");
        }
    }

    if let Some(path) = args.record {
        std::fs::write(&path, recorder.to_jsonl()?)
            .with_context(|| format!("writing recording to {path}"))?;
        println!("recording written to {path}");
    }
    Ok(())
}

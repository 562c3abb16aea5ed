// SPDX-FileCopyrightText: The djio authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    io::{stdin, stdout, Write as _},
    sync::{mpsc, Arc},
    time::Duration,
};

use midibridge::{
    BridgeConfig, Direction, MidiBackend as _, MidiMessage, MidirBackend, SessionRegistry,
    TransportPolicy, UnattachedInputPolicy,
};

fn main() {
    pretty_env_logger::init();
    match run() {
        Ok(()) => (),
        Err(err) => println!("Error: {err}"),
    }
}

fn config_from_env() -> anyhow::Result<BridgeConfig> {
    let mut config = BridgeConfig::default();
    if let Ok(policy) = std::env::var("MIDIBRIDGE_UNATTACHED_INPUT") {
        config.unattached_input = policy.parse::<UnattachedInputPolicy>()?;
    }
    if let Ok(policy) = std::env::var("MIDIBRIDGE_TRANSPORT") {
        config.transport = policy.parse::<TransportPolicy>()?;
    }
    Ok(config)
}

fn run() -> anyhow::Result<()> {
    let config = config_from_env()?;
    let backend = Arc::new(MidirBackend::new("midibridge monitor"));
    let mut registry = SessionRegistry::new(Arc::clone(&backend) as _, config);
    registry.register(backend.discover()?);

    let mut args = std::env::args().skip(1);
    let input_name = match args.next() {
        Some(name) => name,
        None => {
            println!("\nAvailable input ports:");
            let inputs = registry
                .descriptors()
                .iter()
                .filter(|descriptor| descriptor.direction == Direction::Input)
                .cloned()
                .collect::<Vec<_>>();
            if inputs.is_empty() {
                anyhow::bail!("no input port found");
            }
            for (i, descriptor) in inputs.iter().enumerate() {
                println!("{i}: {name}", name = descriptor.name());
            }
            print!("Please select a port: ");
            stdout().flush()?;
            let mut input = String::new();
            stdin().read_line(&mut input)?;
            let index = input.trim().parse::<usize>()?;
            inputs
                .get(index)
                .ok_or_else(|| anyhow::anyhow!("invalid port index {index}"))?
                .name()
                .to_owned()
        }
    };
    let input = registry
        .find_by_name(Direction::Input, &input_name)
        .ok_or_else(|| anyhow::anyhow!("no input port \"{input_name}\""))?;
    let thru = args
        .next()
        .map(|output_name| {
            registry
                .find_by_name(Direction::Output, &output_name)
                .ok_or_else(|| anyhow::anyhow!("no output port \"{output_name}\""))
        })
        .transpose()?;

    // Messages are forwarded outside of the native callback
    let (tx, rx) = mpsc::channel();
    input.attach_consumer(move |message: MidiMessage| {
        tx.send(message).ok();
    });
    input.open()?;
    if let Some(thru) = &thru {
        thru.open()?;
    }

    println!("Starting endless loop, press CTRL-C to exit...");
    loop {
        match rx.recv_timeout(Duration::from_millis(1000)) {
            Ok(message) => {
                println!(
                    "{name}@{position}: {message:x?} (len = {len})",
                    name = input.descriptor().name(),
                    position = input.position(),
                    len = message.as_bytes().len(),
                );
                if let Some(thru) = &thru {
                    if let Err(err) = thru.send(message.as_bytes()) {
                        println!("Failed to forward message: {err}");
                    }
                }
                continue;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => (),
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
        let name = input.descriptor().name();
        match (backend.is_available(input.descriptor()), input.is_open()) {
            (true, false) => {
                println!("{name}: reopening");
                if let Err(err) = input.open() {
                    println!("{name}: {err}");
                }
            }
            (false, true) => {
                println!("{name}: closing");
                input.close();
            }
            (false, false) => println!("{name}: unavailable"),
            (true, true) => (),
        }
    }
    Ok(())
}

use mdbwire_core::{DriverError, Parameters, Request};
use mdbwire_protocol::IoBuffer;
use mdbwire_transport::DriverClient;

pub const USAGE: &str = "\
Usage: mdbwire <url> [catalog | query <text> | cancel <worker> <token>] [--read <bytes>]

Connects to a MillenniumDB server, performs the handshake, optionally sends
one request and hex-dumps the first <bytes> bytes of the reply.";

#[derive(Debug, PartialEq)]
pub struct CliArgs {
    pub url: String,
    pub request: Option<Request>,
    pub read: usize,
}

pub fn parse_args(args: &[String]) -> Result<CliArgs, String> {
    let mut positional = Vec::new();
    let mut read = 0;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--read" => {
                let value = iter.next().ok_or("--read needs a byte count")?;
                read = value
                    .parse()
                    .map_err(|_| format!("invalid byte count: {value}"))?;
            }
            "-h" | "--help" => return Err(USAGE.to_string()),
            _ => positional.push(arg.as_str()),
        }
    }

    let (url, rest) = positional.split_first().ok_or(USAGE)?;

    let request = match rest {
        [] => None,
        ["catalog"] => Some(Request::Catalog),
        ["query", text] => Some(Request::query(*text, Parameters::new())),
        ["cancel", worker, token] => {
            let worker = worker
                .parse()
                .map_err(|_| format!("invalid worker index: {worker}"))?;
            Some(Request::cancel(worker, *token))
        }
        other => return Err(format!("unexpected arguments: {}\n\n{USAGE}", other.join(" "))),
    };

    Ok(CliArgs {
        url: url.to_string(),
        request,
        read,
    })
}

/// Connects, sends the optional request and returns the bytes read back.
pub fn execute(args: &CliArgs) -> Result<Vec<u8>, DriverError> {
    let mut client = DriverClient::connect_url(&args.url)?;
    log::info!("Handshake with {} succeeded", client.connection().address());

    if let Some(request) = &args.request {
        client.send(request)?;
        log::info!("Sent {} request", request.name());
    }

    let mut buffer = IoBuffer::new();
    if args.read > 0 {
        client.receive_into(&mut buffer, args.read)?;
    }

    client.close();
    Ok(buffer.used().to_vec())
}

pub fn run(args: &[String]) -> i32 {
    let args = match parse_args(args) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return 2;
        }
    };

    match execute(&args) {
        Ok(bytes) => {
            if !bytes.is_empty() {
                println!("{}", hex::encode(bytes));
            }
            0
        }
        Err(e) => {
            log::error!("{e}");
            1
        }
    }
}

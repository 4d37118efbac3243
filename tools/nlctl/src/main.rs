// SPDX-License-Identifier: MPL-2.0

//! `nlctl` sends netlink requests to the kernel and prints netlink traffic.
//!
//! ```text
//! nlctl --protocol 0 ack --type 16 --flags 0x400 --seq 7 --payload 00000000...
//! nlctl --protocol 0 --groups 0x1 listen --types 16,17 --count 10
//! ```

use std::{process::ExitCode, time::Duration};

use clap::{ArgAction, Args, Parser, Subcommand};
use log::info;
use nl_transport::{
    DEFAULT_RECEIVE_SIZE, GroupIdSet, MessageBuilder, NetlinkConfig, NetlinkSocket,
    NetlinkProtocolId, Result, SegHdrCommonFlags,
};

mod logger;

/// The CLI of `nlctl`.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The netlink family, such as 0 for `NETLINK_ROUTE`.
    #[arg(long, global = true, default_value = "0", value_parser = parse_u32)]
    protocol: NetlinkProtocolId,

    /// The multicast groups to join, as a bit mask.
    #[arg(long, global = true, default_value = "0", value_parser = parse_u32)]
    groups: u32,

    /// Give up waiting for a message after this many milliseconds.
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    /// Log more. Repeat for even more.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Send a request to the kernel and wait for its ACK.
    Ack(AckArgs),
    /// Print every segment of the given types.
    Listen(ListenArgs),
}

#[derive(Debug, Args)]
struct AckArgs {
    /// The segment type of the request.
    #[arg(long = "type", value_parser = parse_u16)]
    type_: u16,

    /// Flags added to `NLM_F_REQUEST | NLM_F_ACK`.
    #[arg(long, default_value = "0", value_parser = parse_u16)]
    flags: u16,

    /// The sequence number of the request.
    #[arg(long, default_value_t = 1)]
    seq: u32,

    /// The request payload in hex, sent as is after the header.
    #[arg(long, value_parser = parse_hex)]
    payload: Option<HexPayload>,
}

#[derive(Debug, Args)]
struct ListenArgs {
    /// The segment types to print, separated by commas.
    #[arg(long, required = true, value_delimiter = ',', value_parser = parse_u16)]
    types: Vec<u16>,

    /// Stop after this many segments.
    #[arg(long)]
    count: Option<usize>,

    /// The largest datagram to accept.
    #[arg(long, default_value_t = DEFAULT_RECEIVE_SIZE)]
    max_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct HexPayload(Vec<u8>);

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init(logger::level_filter(cli.verbose));

    let mut config = NetlinkConfig::new(cli.protocol);
    config
        .set_groups(GroupIdSet::new(cli.groups))
        .set_recv_timeout(cli.timeout_ms.map(Duration::from_millis));

    let result = match &cli.command {
        Command::Ack(args) => execute_ack_command(&config, args),
        Command::Listen(args) => {
            config.set_max_receive_size(args.max_size);
            execute_listen_command(&config, args)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("nlctl: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn execute_ack_command(config: &NetlinkConfig, args: &AckArgs) -> Result<()> {
    let mut socket = NetlinkSocket::open(config);

    let flags = (SegHdrCommonFlags::REQUEST | SegHdrCommonFlags::ACK).bits() | args.flags;
    let mut builder = MessageBuilder::new(args.type_, flags);
    builder.seq(args.seq);
    if let Some(payload) = &args.payload {
        builder.body(payload.0.as_slice());
    }
    let request = builder.finish()?;

    socket.request_ack(&request)?;
    println!("seq {}: ACK", args.seq);
    Ok(())
}

fn execute_listen_command(config: &NetlinkConfig, args: &ListenArgs) -> Result<()> {
    let mut socket = NetlinkSocket::open(config);
    let port = socket.local_port()?;
    info!(
        "listening on port {} for types {:?} (groups {:#x})",
        port,
        args.types,
        config.groups().as_u32()
    );

    let mut received = 0;
    while args.count.is_none_or(|count| received < count) {
        let segment = socket.receive_types(&args.types, args.max_size)?;
        let header = segment.header();
        println!(
            "type={} flags={:#x} seq={} pid={} payload={}",
            header.type_,
            header.flags,
            header.seq,
            header.pid,
            segment.payload().len()
        );
        received += 1;
    }

    Ok(())
}

fn parse_u16(arg: &str) -> core::result::Result<u16, String> {
    let value = parse_u32(arg)?;
    u16::try_from(value).map_err(|_| format!("{} does not fit in 16 bits", arg))
}

/// Parses a decimal number or a hexadecimal one with a `0x` prefix.
fn parse_u32(arg: &str) -> core::result::Result<u32, String> {
    let parsed = match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => arg.parse(),
    };
    parsed.map_err(|err| format!("invalid number {:?}: {}", arg, err))
}

fn parse_hex(arg: &str) -> core::result::Result<HexPayload, String> {
    let digits: Vec<u8> = arg
        .bytes()
        .filter(|byte| !matches!(byte, b' ' | b':' | b'_'))
        .collect();
    if digits.len() % 2 != 0 {
        return Err(format!("{:?} has an odd number of hex digits", arg));
    }

    digits
        .chunks_exact(2)
        .map(|pair| {
            let pair = core::str::from_utf8(pair).map_err(|err| err.to_string())?;
            u8::from_str_radix(pair, 16).map_err(|_| format!("{:?} is not a hex byte", pair))
        })
        .collect::<core::result::Result<Vec<_>, _>>()
        .map(HexPayload)
}

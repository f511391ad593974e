//! Replays a capture of clientbound play packets through a downstream bridge
//! and reports what the client would have received.

use anyhow::Context;
use bytes::BytesMut;
use clap::Parser;
use futures::StreamExt;
use minecraft_downstream_bridge::{
    config::BridgeConfig,
    protocol::{
        packet::RawPacket,
        vanilla_codec::{CompressionThreshold, VanillaCodec},
        PROTOCOL_VERSION,
    },
    server::ServerInfo,
    session::{ChannelClient, ClientAction, Session},
    tab_list::ServerUnique,
    DownstreamBridge, ProxyContext,
};
use std::{num::NonZeroUsize, path::PathBuf, sync::Arc};
use tokio::{fs::File, io::AsyncWriteExt, task};
use tokio_util::codec::FramedRead;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Bridge configuration (TOML). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = "Player")]
    player: String,
    #[arg(long, value_parser = parse_uuid, default_value = "0")]
    unique_id: u128,
    /// Backend the capture came from. Looked up in the configured servers.
    #[arg(long, default_value = "capture")]
    server: String,
    #[arg(long, default_value_t = PROTOCOL_VERSION)]
    protocol_version: i32,
    /// Compression threshold the capture was framed with.
    #[arg(long)]
    compression_threshold: Option<NonZeroUsize>,
    /// Writes the packets the client would receive, framed without compression.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Framed clientbound play packets.
    capture: PathBuf,
}

fn parse_uuid(s: &str) -> anyhow::Result<u128> {
    Ok(u128::from_str_radix(&s.replace('-', ""), 16)?)
}

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = match &args.config {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::default(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.logging.level))?,
        )
        .init();

    let (client, actions) = ChannelClient::new(args.player.clone());
    let output = match &args.output {
        Some(path) => Some(File::create(path).await?),
        None => None,
    };
    let drain = task::spawn(drain_client_actions(actions, output));
    let worker = task::spawn(replay(args, config, client));

    let packets = worker.await??;
    let sent = drain.await??;
    tracing::info!("Replayed {packets} packets; the client received {sent}");
    Ok(())
}

/// Runs the bridge over the capture, as the session worker would over a
/// live backend connection.
async fn replay(args: Args, config: BridgeConfig, client: ChannelClient) -> anyhow::Result<usize> {
    let server = config
        .server(&args.server)
        .unwrap_or_else(|| Arc::new(ServerInfo::new(args.server.as_str(), "capture")));
    let context = Arc::new(ProxyContext::from_config(&config));

    let mut codec = VanillaCodec::new();
    if let Some(threshold) = args.compression_threshold {
        codec.enable_compression(CompressionThreshold::new(threshold))?;
    }
    let file = File::open(&args.capture)
        .await
        .with_context(|| format!("failed to open {}", args.capture.display()))?;
    let mut frames = FramedRead::new(file, CaptureFrames(codec));

    let mut session = Session::new(
        args.player,
        args.unique_id,
        args.protocol_version,
        Box::new(client),
        Box::new(ServerUnique::new()),
        Box::new(config.join_queue()),
    );
    let mut bridge = DownstreamBridge::new(&session, server, context);
    tracing::info!("Bridge {bridge} started");

    let mut packets = 0;
    while let Some(frame) = frames.next().await {
        let packet = match frame {
            Ok(packet) => packet,
            Err(e) => {
                bridge.exception(&mut session, &e);
                break;
            }
        };
        packets += 1;
        if let Err(e) = bridge.process(&mut session, packet) {
            tracing::error!("{bridge}: ending session: {e}");
            bridge.server().mark_obsolete();
            session.client().disconnect(e.to_string());
            break;
        }
    }

    bridge.disconnected(&mut session);
    Ok(packets)
}

/// Logs what the bridge sends toward the client, optionally writing the
/// packets out. Ends once the session is gone.
async fn drain_client_actions(
    actions: flume::Receiver<ClientAction>,
    mut output: Option<File>,
) -> anyhow::Result<usize> {
    let mut codec = VanillaCodec::new();
    let mut sent = 0;
    while let Ok(action) = actions.recv_async().await {
        match action {
            ClientAction::Send(packet) => {
                sent += 1;
                tracing::debug!(
                    "Client <- packet 0x{:02x} ({} bytes)",
                    packet.id()?,
                    packet.bytes().len()
                );
                if let Some(output) = &mut output {
                    output.write_all(&codec.encode_packet(&packet)?).await?;
                }
            }
            ClientAction::Message(message) => tracing::info!("Client <- message: {message}"),
            ClientAction::Disconnect(reason) => tracing::info!("Client disconnected: {reason}"),
            ClientAction::Connect { server, reason } => {
                tracing::info!("Client sent to {server} ({reason})")
            }
        }
    }
    if let Some(output) = &mut output {
        output.flush().await?;
    }
    Ok(sent)
}

/// Adapts [`VanillaCodec`] to `FramedRead`.
struct CaptureFrames(VanillaCodec);

impl tokio_util::codec::Decoder for CaptureFrames {
    type Item = RawPacket;
    type Error = anyhow::Error;

    fn decode(&mut self, src: &mut BytesMut) -> anyhow::Result<Option<RawPacket>> {
        if !src.is_empty() {
            self.0.give_data(&src.split());
        }
        self.0.decode_packet()
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> anyhow::Result<Option<RawPacket>> {
        match self.decode(src)? {
            Some(packet) => Ok(Some(packet)),
            None if self.0.has_pending_data() => Err(anyhow::anyhow!("capture ends inside a frame")),
            None => Ok(None),
        }
    }
}

//! Anonymous read-only chat connection
//!
//! Joins one channel as a `justinfan` guest, requests IRCv3 tags so emote
//! spans arrive with each message, answers keepalive pings, and forwards
//! every `PRIVMSG` to the overlay over an mpsc channel. A dropped connection
//! is re-established after a fixed delay until the receiver goes away.

use super::{ChatMessage, IrcMessage};
use crate::networking::{FetchError, NetworkResult};
use rand::Rng;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub host: String,
    pub port: u16,
    pub channel: String,
    pub reconnect_delay: Duration,
}

pub struct ChatTransport {
    settings: TransportSettings,
    nick: String,
}

impl ChatTransport {
    pub fn new(settings: TransportSettings) -> Self {
        let nick = format!("justinfan{}", rand::rng().random_range(10_000..99_999));
        Self { settings, nick }
    }

    /// Spawn the connection loop. Messages arrive on the returned receiver.
    pub fn spawn(self, buffer: usize) -> (mpsc::Receiver<ChatMessage>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let handle = tokio::spawn(async move { self.run(tx).await });
        (rx, handle)
    }

    async fn run(self, tx: mpsc::Sender<ChatMessage>) {
        loop {
            match self.session(&tx).await {
                Ok(()) => {
                    info!("💬 Chat receiver closed, stopping transport");
                    return;
                }
                Err(err) => {
                    warn!(
                        "💬 Chat connection to #{} lost: {} (retrying in {:?})",
                        self.settings.channel, err, self.settings.reconnect_delay
                    );
                }
            }
            if tx.is_closed() {
                return;
            }
            tokio::time::sleep(self.settings.reconnect_delay).await;
        }
    }

    /// One connection lifetime. `Ok` means the overlay stopped listening.
    async fn session(&self, tx: &mpsc::Sender<ChatMessage>) -> NetworkResult<()> {
        let address = format!("{}:{}", self.settings.host, self.settings.port);
        let stream = TcpStream::connect(&address).await?;
        let (reader, mut writer) = stream.into_split();

        let channel = self.settings.channel.to_ascii_lowercase();
        for line in handshake_lines(&self.nick, &channel) {
            writer.write_all(line.as_bytes()).await?;
        }
        writer.flush().await?;
        info!("💬 Connected to {} as {}, joined #{}", address, self.nick, channel);

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            let Some(message) = IrcMessage::parse(&line) else {
                continue;
            };
            match message.command.as_str() {
                "PING" => {
                    let token = message.params.first().cloned().unwrap_or_default();
                    writer.write_all(format!("PONG :{}\r\n", token).as_bytes()).await?;
                }
                "RECONNECT" => {
                    debug!("Server requested reconnect");
                    return Err(FetchError::Disconnected);
                }
                "PRIVMSG" => {
                    if let Some(chat) = message.into_chat_message() {
                        if tx.send(chat).await.is_err() {
                            return Ok(());
                        }
                    }
                }
                _ => {}
            }
        }
        Err(FetchError::Disconnected)
    }
}

fn handshake_lines(nick: &str, channel: &str) -> Vec<String> {
    vec![
        "CAP REQ :twitch.tv/tags twitch.tv/commands\r\n".to_string(),
        "PASS SCHMOOPIIE\r\n".to_string(),
        format!("NICK {}\r\n", nick),
        format!("JOIN #{}\r\n", channel),
    ]
}

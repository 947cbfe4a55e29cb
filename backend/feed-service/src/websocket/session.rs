use std::time::Instant;

use actix::{Actor, ActorContext, AsyncContext, StreamHandler};
use actix_web_actors::ws;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};

use super::{PostBroadcastDispatcher, SubscriberId};
use crate::config::WebSocketConfig;

/// Broadcast payload forwarded from the dispatcher channel
struct Outbound(String);

/// One live connection. Receives broadcasts; client text frames are ignored.
pub struct WsSession {
    subscriber_id: SubscriberId,
    dispatcher: PostBroadcastDispatcher,
    outbound: Option<UnboundedReceiver<String>>,
    config: WebSocketConfig,
    hb: Instant,
}

impl WsSession {
    pub fn new(
        subscriber_id: SubscriberId,
        outbound: UnboundedReceiver<String>,
        dispatcher: PostBroadcastDispatcher,
        config: WebSocketConfig,
    ) -> Self {
        Self {
            subscriber_id,
            dispatcher,
            outbound: Some(outbound),
            config,
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        let timeout = self.config.client_timeout;
        ctx.run_interval(self.config.heartbeat_interval, move |act, ctx| {
            if Instant::now().duration_since(act.hb) > timeout {
                tracing::warn!(
                    subscriber = %act.subscriber_id,
                    "WebSocket heartbeat failed, disconnecting"
                );
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }
}

impl Actor for WsSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(subscriber = %self.subscriber_id, "WebSocket session started");

        self.hb(ctx);

        // bridge the dispatcher channel into this actor
        if let Some(rx) = self.outbound.take() {
            ctx.add_stream(UnboundedReceiverStream::new(rx).map(Outbound));
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(subscriber = %self.subscriber_id, "WebSocket session stopped");

        let dispatcher = self.dispatcher.clone();
        let subscriber_id = self.subscriber_id;
        actix::spawn(async move {
            dispatcher.unsubscribe(subscriber_id).await;
        });
    }
}

impl StreamHandler<Outbound> for WsSession {
    fn handle(&mut self, msg: Outbound, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        // the dispatcher dropped our sender
        tracing::debug!(subscriber = %self.subscriber_id, "broadcast channel closed");
        ctx.stop();
    }
}

// Handle WebSocket protocol messages
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for WsSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(_)) => {
                self.hb = Instant::now();
                tracing::debug!(subscriber = %self.subscriber_id, "ignoring client text frame");
            }
            Ok(ws::Message::Binary(_)) => {
                tracing::warn!("Binary WebSocket messages not supported");
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::info!(subscriber = %self.subscriber_id, ?reason, "WebSocket close received");
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                tracing::warn!(subscriber = %self.subscriber_id, error = %e, "WebSocket protocol error");
                ctx.stop();
            }
        }
    }
}

use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;

use crate::config::WebSocketConfig;
use crate::websocket::{session::WsSession, PostBroadcastDispatcher};

/// Upgrade to a live feed connection. Connections are anonymous: every one
/// receives every broadcast.
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    dispatcher: web::Data<PostBroadcastDispatcher>,
    config: web::Data<WebSocketConfig>,
) -> Result<HttpResponse, Error> {
    let dispatcher = dispatcher.get_ref().clone();
    let (subscriber_id, rx) = dispatcher.subscribe().await;

    let session = WsSession::new(subscriber_id, rx, dispatcher.clone(), config.get_ref().clone());

    match ws::start(session, &req, stream) {
        Ok(resp) => Ok(resp),
        Err(e) => {
            // handshake rejected; the actor never started, so clean up here
            dispatcher.unsubscribe(subscriber_id).await;
            Err(e)
        }
    }
}

use actix::Addr;
use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

use crate::broker::{Broker, Browse};
use crate::template::MessageTemplate;
use crate::types::{Email, MessageId};

#[derive(Serialize)]
struct Sent {
    id: MessageId,
}

#[derive(Serialize)]
struct Failure {
    error: String,
}

#[actix_web::get("/queues/{name}")]
async fn browse_queue(name: web::Path<String>, broker: web::Data<Addr<Broker>>) -> impl Responder {
    let destination = name.into_inner();
    match broker.send(Browse { destination }).await {
        Ok(Ok(messages)) => HttpResponse::Ok().json(messages),
        Ok(Err(err)) => HttpResponse::InternalServerError().json(Failure {
            error: err.to_string(),
        }),
        Err(err) => HttpResponse::ServiceUnavailable().json(Failure {
            error: err.to_string(),
        }),
    }
}

#[actix_web::post("/queues/{name}/emails")]
async fn send_email(
    name: web::Path<String>,
    email: web::Json<Email>,
    template: web::Data<MessageTemplate>,
) -> impl Responder {
    match template.convert_and_send(&name, &email.into_inner()).await {
        Ok(id) => HttpResponse::Accepted().json(Sent { id }),
        Err(err) => {
            log::error!("failed to send email to {}: {}", name, err);
            HttpResponse::InternalServerError().json(Failure {
                error: err.to_string(),
            })
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(browse_queue).service(send_email);
}

use std::sync::Arc;

use actix::Actor;
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use mqdemo::broker::Broker;
use mqdemo::config::Config;
use mqdemo::container::ContainerFactory;
use mqdemo::converter::JsonMessageConverter;
use mqdemo::database::QueueStore;
use mqdemo::error_handler::{AcknowledgingErrorHandler, ErrorHandler, LoggingErrorHandler};
use mqdemo::receiver::{EmailReceiver, RECEIVER_ID};
use mqdemo::template::MessageTemplate;
use mqdemo::types::Email;

#[actix::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::from_env().map_err(to_io)?;
    let store = QueueStore::open(&config.store_path).map_err(to_io)?;
    let broker = Broker::new(store, config.max_deliveries).start();

    let converter = JsonMessageConverter::new(config.type_id_property.clone());
    let error_handler: Arc<dyn ErrorHandler> = if config.ack_on_error {
        Arc::new(AcknowledgingErrorHandler)
    } else {
        Arc::new(LoggingErrorHandler)
    };
    let factory = ContainerFactory::new(broker.clone(), error_handler);
    factory
        .create_container(
            RECEIVER_ID,
            config.queue.clone(),
            EmailReceiver::new(converter.clone(), config.reject_recipient.clone()),
        )
        .start();

    let template = MessageTemplate::new(broker.clone(), converter);
    println!("Sending an email message.");
    for email in [
        Email::new("info@example.com", "Hello"),
        Email::new("dturanski@example.com", "Hello"),
    ] {
        template
            .convert_and_send(&config.queue, &email)
            .await
            .map_err(to_io)?;
    }

    log::info!("admin endpoint on {}", config.http_addr);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:8080")
            .allow_any_method()
            .allow_any_header();
        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(broker.clone()))
            .app_data(web::Data::new(template.clone()))
            .configure(mqdemo::http::configure)
    })
    .bind(&config.http_addr)?
    .run()
    .await?;
    Ok(())
}

fn to_io<E: std::error::Error + Send + Sync + 'static>(err: E) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, err)
}

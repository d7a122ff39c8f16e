#[macro_use]
extern crate rocket;

use config::Config;
use rocket::fairing::AdHoc;
use rocket::serde::json::Json;
use rocket::{Build, Rocket, State};
use std::sync::Mutex;
use std::time::Duration;
use sun2000_rs::bus::Sun2000;
use sun2000_rs::model::Snapshot;
use sun2000_rs::poller;
use sun2000_rs::publish::Publisher;
use sun2000_rs::store::SnapshotStore;
use tokio::sync::watch;
use tokio::task::JoinHandle;

const STATUS_PORT: u16 = 3000;

#[derive(Clone, serde::Deserialize)]
pub struct Sun2000Config {
    host: String,
    port: u16,
    unit: u8,
    interval: u64,
    influx_url: Option<String>,
    influx_org: Option<String>,
    influx_token: Option<String>,
    influx_bucket: Option<String>,
}

impl Sun2000Config {
    /// Sink configuration is all-or-nothing: absent disables publishing,
    /// partial is a startup error.
    fn publisher(&self) -> Option<Publisher> {
        match (
            &self.influx_url,
            &self.influx_org,
            &self.influx_token,
            &self.influx_bucket,
        ) {
            (None, None, None, None) => None,
            (Some(url), Some(org), Some(token), Some(bucket)) => Some(Publisher::new(
                url,
                org,
                token,
                bucket.to_owned(),
                self.unit.to_string(),
            )),
            _ => panic!(
                "incomplete sink configuration: set all of SUN2000_INFLUX_URL, \
                 SUN2000_INFLUX_ORG, SUN2000_INFLUX_TOKEN and SUN2000_INFLUX_BUCKET, or none"
            ),
        }
    }
}

pub fn read_settings() -> Sun2000Config {
    let mut settings = Config::default();
    settings
        .merge(config::Environment::with_prefix("SUN2000"))
        .unwrap()
        .set_default("port", 6607)
        .unwrap()
        .set_default("unit", 0)
        .unwrap()
        .set_default("interval", 5)
        .unwrap();

    settings
        .try_into()
        .expect("Configuration error (is SUN2000_HOST set?)")
}

/// Handle for stopping the background poller during rocket shutdown.
struct PollerHandle {
    cancel: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

#[get("/status")]
fn status_route(store: &State<SnapshotStore>) -> Json<Snapshot> {
    Json(store.get())
}

#[launch]
fn rocket() -> Rocket<Build> {
    env_logger::init();

    let settings = read_settings();
    let store = SnapshotStore::new();
    let device = Sun2000::new(settings.host.clone(), settings.port, settings.unit);
    let publisher = settings.publisher();
    let interval = Duration::from_secs(settings.interval);
    let (cancel, cancel_rx) = watch::channel(false);

    let poller_store = store.clone();
    let figment = rocket::Config::figment().merge(("port", STATUS_PORT));

    rocket::custom(figment)
        .manage(store)
        .manage(PollerHandle {
            cancel,
            task: Mutex::new(None),
        })
        .mount("/", routes![status_route])
        .attach(AdHoc::on_liftoff("telemetry poller", {
            let device = Mutex::new(Some(device));
            move |rocket| {
                Box::pin(async move {
                    let device = device.lock().ok().and_then(|mut slot| slot.take()).unwrap();
                    let task = tokio::spawn(poller::run(
                        device,
                        poller_store,
                        publisher,
                        interval,
                        cancel_rx,
                    ));
                    if let Some(handle) = rocket.state::<PollerHandle>() {
                        if let Ok(mut slot) = handle.task.lock() {
                            *slot = Some(task);
                        }
                    }
                })
            }
        }))
        .attach(AdHoc::on_shutdown("telemetry poller", |rocket| {
            Box::pin(async move {
                if let Some(handle) = rocket.state::<PollerHandle>() {
                    let _ = handle.cancel.send(true);
                    let task = handle.task.lock().ok().and_then(|mut slot| slot.take());
                    if let Some(task) = task {
                        if let Err(e) = task.await {
                            log::warn!("poller task failed: {:?}", e);
                        }
                    }
                }
            })
        }))
}

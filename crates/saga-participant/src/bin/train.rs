use booking_domain::ResourceKind;
use booking_saga_participant::Config;

#[tokio::main]
async fn main() {
    booking_saga_participant::run_main(ResourceKind::Train, Config::from_env()).await
}

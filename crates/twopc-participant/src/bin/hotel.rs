use booking_domain::ResourceKind;
use booking_twopc_participant::Config;

#[tokio::main]
async fn main() {
    booking_twopc_participant::run_main(ResourceKind::Hotel, Config::from_env()).await
}

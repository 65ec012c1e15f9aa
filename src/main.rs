//! Annonces back-office - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    annonces_backoffice::run().await;
}

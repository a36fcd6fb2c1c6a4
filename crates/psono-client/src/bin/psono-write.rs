//! Adds a secret to the password datastore of the account behind an API key.
//!
//! Configuration comes from the environment: `API_KEY_ID`,
//! `API_KEY_PRIVATE_KEY`, `API_KEY_SECRET_KEY`, `SERVER_URL`,
//! `SERVER_SIGNATURE`, and optionally `SERVER_PUBLIC_KEY`, `SSL_VERIFY` and
//! `DEVICE_DESCRIPTION`.

use anyhow::{bail, Context};
use serde_json::json;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use psono_client::{Client, ClientConfig, ClientError, HttpTransport, Operation, Transport};

const FOLDER_NAME: &str = "My Folder";
const SECRET_NAME: &str = "My Secret";
const SECRET_TYPE: &str = "application_password";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ClientConfig::from_env().context("loading configuration")?;
    let transport = HttpTransport::from_config(&config).context("building HTTP client")?;

    let client = Client::connect(&config, transport)
        .await
        .map_err(describe)
        .context("login")?;

    write_and_logout(client).await
}

/// Run the write flow, then end the session whether or not it succeeded.
async fn write_and_logout<T: Transport>(client: Client<T>) -> anyhow::Result<()> {
    let outcome = write_secret(&client).await;
    let logout = client.logout().await;

    match (outcome, logout) {
        (Ok(()), Ok(())) => {
            println!("logged out");
            Ok(())
        }
        (Ok(()), Err(err)) => Err(describe(err)).context("logout"),
        (Err(err), logout) => {
            if let Err(logout_err) = logout {
                warn!(error = %logout_err, "logout after failure");
            }
            Err(err)
        }
    }
}

async fn write_secret<T: Transport>(client: &Client<T>) -> anyhow::Result<()> {
    let scope = client.scope();
    for operation in [
        Operation::ReadDatastore,
        Operation::CreateSecret,
        Operation::WriteDatastore,
    ] {
        if let Err(err) = scope.check(operation) {
            bail!("{err}");
        }
    }

    let mut datastore = client
        .open_password_datastore()
        .await
        .map_err(describe)
        .context("opening password datastore")?;
    println!("opened password datastore {}", datastore.id());

    let item = client
        .add_secret(
            &mut datastore,
            FOLDER_NAME,
            SECRET_NAME,
            SECRET_TYPE,
            &json!({
                "application_password_title": SECRET_NAME,
                "application_password_username": "MyUsername",
                "application_password_password": "MyPassword",
                "application_password_notes": "A note",
                "application_password_auto_submit": false,
                "application_password_url_filter": "www.example.com",
            }),
        )
        .await
        .map_err(describe)
        .context("creating secret")?;
    println!("created secret {} in {FOLDER_NAME:?}", item.secret_id.as_deref().unwrap_or("?"));

    client
        .save(&datastore)
        .await
        .map_err(describe)
        .context("writing datastore")?;
    println!("datastore saved");
    Ok(())
}

fn describe(err: ClientError) -> anyhow::Error {
    let kind = err.kind();
    anyhow::Error::new(err).context(kind.to_string())
}

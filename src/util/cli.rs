use crate::auth::Store;
use crate::core::types::{ClientId, ClientSecret, RedirectUri, Scope};
use crate::db::DbStore;
use crate::oidc::types::Nonce;
use crate::provider::keys::KeyService;
use crate::provider::token::TokenService;
use crate::provider::OAuth2Provider;
use crate::util::hash::HashingService;

use clap::Parser;

#[derive(Parser)]
#[clap(
    name = "kagiko-util",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS")
)]
pub struct Options {
    #[clap(env = "DATABASE_URL")]
    database_url: String,
    #[clap(env = "HASH_SECRET")]
    hash_secret: String,
    #[clap(subcommand)]
    command: SubCommand,
}

#[derive(Parser)]
enum SubCommand {
    ListClients(ListClients),
    CreateClient(CreateClient),
    DeleteClient(DeleteClient),
    CreateResourceServer(CreateResourceServer),
    IssueCode(IssueCode),
    GenerateRsaKey(GenerateRsaKey),
}

#[derive(Parser)]
struct ListClients;

#[derive(Parser)]
struct CreateClient {
    #[clap(short, long)]
    id: String,
    #[clap(short, long)]
    name: String,
    #[clap(short, long)]
    secret: String,
}

#[derive(Parser)]
struct DeleteClient {
    #[clap(short, long)]
    id: String,
}

#[derive(Parser)]
struct CreateResourceServer {
    #[clap(short, long)]
    username: String,
    #[clap(short, long)]
    secret: String,
}

/// Mints an authorization code directly, standing in for the (external)
/// authorization UI when exercising the flow by hand.
#[derive(Parser)]
struct IssueCode {
    #[clap(short, long)]
    client_id: String,
    #[clap(short = 'u', long)]
    subject: String,
    #[clap(short, long)]
    scope: String,
    #[clap(short, long)]
    redirect_uri: String,
    #[clap(short, long)]
    nonce: Option<String>,
}

#[derive(Parser)]
struct GenerateRsaKey {
    #[clap(short, long)]
    out: String,
}

async fn get_database(uri: &str) -> DbStore {
    DbStore::acquire(uri)
        .await
        .expect("Failed to connect to database")
}

fn get_hasher(secret: &str) -> HashingService {
    HashingService::with_secret_key(secret.to_string())
}

async fn list_clients(_c: &ListClients, opts: &Options) {
    let db = get_database(&opts.database_url).await;

    let results = db.list_clients().await.expect("Failed to get clients");

    for client in results {
        println!("{} (name: \"{}\")", client.id.0, client.name);
    }
}

async fn create_client(c: &CreateClient, opts: &Options) {
    let db = get_database(&opts.database_url).await;
    let hasher = get_hasher(&opts.hash_secret);

    let secret_hash = hasher
        .hash(&ClientSecret(c.secret.to_string()))
        .expect("Failed to hash secret");

    db.put_client(ClientId(c.id.to_string()), c.name.to_string(), secret_hash)
        .await
        .expect("Failed to add client");
}

async fn delete_client(c: &DeleteClient, opts: &Options) {
    let db = get_database(&opts.database_url).await;

    db.delete_client(&ClientId(c.id.to_string()))
        .await
        .expect("Failed to delete client");
}

async fn create_resource_server(c: &CreateResourceServer, opts: &Options) {
    let db = get_database(&opts.database_url).await;
    let hasher = get_hasher(&opts.hash_secret);

    let secret_hash = hasher
        .hash(&ClientSecret(c.secret.to_string()))
        .expect("Failed to hash secret");

    db.put_resource_server(c.username.to_string(), secret_hash)
        .await
        .expect("Failed to add resource server");
}

async fn issue_code(c: &IssueCode, opts: &Options) {
    let db = get_database(&opts.database_url).await;
    let hasher = get_hasher(&opts.hash_secret);

    // Signing keys are irrelevant for minting a code, but the provider
    // carries them; an ephemeral pair keeps this self-contained.
    let keys = KeyService::new("unused", &KeyService::generate_pem())
        .expect("Failed to build key service");
    let token = TokenService::new(keys, "kagiko".to_string(), 120, 600);
    let provider = OAuth2Provider::new(db, hasher, token);

    let code = provider
        .issue_authorization_code(
            &ClientId(c.client_id.to_string()),
            &c.subject,
            &Scope::from_delimited_parts(&c.scope),
            &RedirectUri(c.redirect_uri.to_string()),
            c.nonce.clone().map(Nonce),
        )
        .await
        .expect("Failed to issue code");

    println!("{}", code.0);
}

fn generate_rsa_key(c: &GenerateRsaKey) {
    let pem = KeyService::generate_pem();
    std::fs::write(&c.out, pem).expect("Failed to write key file");
    println!("Wrote RSA private key to {}", c.out);
}

pub async fn run_cli_action(opts: Options) {
    use SubCommand::*;

    match &opts.command {
        ListClients(c) => list_clients(c, &opts).await,
        CreateClient(c) => create_client(c, &opts).await,
        DeleteClient(c) => delete_client(c, &opts).await,
        CreateResourceServer(c) => create_resource_server(c, &opts).await,
        IssueCode(c) => issue_code(c, &opts).await,
        GenerateRsaKey(c) => generate_rsa_key(c),
    };
}

use clap::{Parser, Subcommand};
use nexus_core::{Config, NewResource, SearchQuery, System};

/// A thin local driver over `nexus-core`, standing in for the HTTP layer
/// this crate's operations are meant to be exposed through. Every
/// invocation builds a fresh `System` — there is no persistence across
/// restarts, so individual subcommands only make sense chained within a
/// single `demo` run or a longer-lived embedder.
#[derive(Parser)]
#[command(name = "nexus")]
#[command(about = "Nexus resource-exchange ledger CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a user and mine once to confirm their endowment.
    Register { handle: String },
    /// Register, mine, publish a resource, then mine the declaration reward.
    Publish {
        handle: String,
        name: String,
        #[arg(long, default_value_t = 0.01)]
        size_gb: f64,
        #[arg(long, default_value = "general")]
        category: String,
    },
    /// Print the current chain summary for a brand new chain.
    Info,
    /// Search the seeded community registry.
    Search {
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Print the seeded community registry grouped by category tag.
    Categories,
    /// Run the full register -> publish -> download -> mine walkthrough
    /// from the design docs' worked examples, printing each balance as it
    /// settles.
    Demo,
}

fn main() {
    tracing_subscriber::fmt::try_init().ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Register { handle } => {
            let sys = System::default();
            match sys.register_user(&handle) {
                Ok(identity) => {
                    sys.mine(&handle);
                    println!("{}", serde_json::json!({ "handle": handle, "identity": identity, "balance": sys.balance(&handle).as_f64() }));
                }
                Err(err) => eprintln!("error: {err}"),
            }
        }
        Commands::Publish { handle, name, size_gb, category } => {
            let sys = System::default();
            sys.register_user(&handle).expect("fresh system, handle cannot collide");
            sys.mine(&handle);
            let resource = NewResource {
                name,
                size_gb,
                uploader: handle.clone(),
                seeds: 0,
                peers: 0,
                description: String::new(),
                category,
                file_hash: String::new(),
                storage_path: String::new(),
            };
            if !sys.publish(&handle, resource) {
                eprintln!("error: publish was not admitted");
                return;
            }
            sys.mine(&handle);
            let published = sys.my_resources(&handle);
            println!("{}", serde_json::to_string_pretty(&published).expect("SharedFile serializes"));
            println!("balance: {}", sys.balance(&handle).as_f64());
        }
        Commands::Info => {
            let sys = System::new(Config::default());
            println!("{}", serde_json::to_string_pretty(&sys.blockchain_info()).expect("ChainInfo serializes"));
        }
        Commands::Search { keyword, category } => {
            let sys = System::default();
            let query = SearchQuery { keyword, category, ..Default::default() };
            let results = sys.search_resources(&query);
            println!("{}", serde_json::to_string_pretty(&results).expect("SharedFile serializes"));
        }
        Commands::Categories => {
            let sys = System::default();
            println!("{}", serde_json::to_string_pretty(&sys.resources_by_category()).expect("category groups serialize"));
        }
        Commands::Demo => run_demo(),
    }
}

fn run_demo() {
    let sys = System::new(Config { difficulty: 2, ..Config::default() });

    sys.register_user("alice").expect("fresh system");
    sys.mine("alice");
    println!("alice registered, balance = {}", sys.balance("alice"));

    sys.publish(
        "alice",
        NewResource {
            name: "Guide.pdf".into(),
            size_gb: 0.025,
            uploader: "alice".into(),
            seeds: 0,
            peers: 0,
            description: "A short guide".into(),
            category: "document".into(),
            file_hash: String::new(),
            storage_path: String::new(),
        },
    );
    sys.mine("alice");
    println!("alice published Guide.pdf, balance = {}", sys.balance("alice"));

    sys.register_user("bob").expect("fresh system");
    sys.mine("bob");
    println!("bob registered, balance = {}", sys.balance("bob"));

    sys.register_user("carol").expect("fresh system");
    sys.mine("alice");

    let resource_id = sys.my_resources("alice")[0].id;
    if sys.download("bob", "alice", resource_id) {
        let block = sys.mine("carol").expect("pool was non-empty");
        println!("carol mined block {} crediting bob's download", block.index);
    }

    println!("final balances: alice={} bob={} carol={}", sys.balance("alice"), sys.balance("bob"), sys.balance("carol"));
    println!("chain valid: {}", sys.blockchain_info().is_valid);
}

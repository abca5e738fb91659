mod handlers;
mod settings;

use std::{env, process::ExitCode};

use log::{error, info, warn, LevelFilter};
use settings::EchoSettings;
use tcp_pool_net::{Connection, Endpoint, SocketResult};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    // 1st command line arg selects the server or the client
    let mode = args.get(1).map(String::as_str).unwrap_or("");

    // 2nd command line arg is the name of the environment
    let environment = args.get(2).map(String::as_str).unwrap_or("dev");

    let settings = match EchoSettings::load(environment) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load settings for {environment}: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(&settings);

    let outcome = match mode {
        "server" => run_server(settings),
        "client" => run_client(settings),
        _ => {
            println!("Pass 'server' or 'client' on the command line");
            return ExitCode::FAILURE;
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(settings: &EchoSettings) {
    let mut clog = colog::default_builder();

    #[cfg(debug_assertions)]
    clog.filter_level(LevelFilter::Debug);

    #[cfg(not(debug_assertions))]
    clog.filter_level(LevelFilter::Info);

    if let Some(level) = settings.log_level() {
        clog.filter_level(level);
    }

    clog.init();
}

fn run_server(settings: EchoSettings) -> SocketResult<()> {
    let mut endpoint = Endpoint::new(handlers::serve_connection, settings.endpoint)?;
    let local_addr = endpoint.bind(settings.port)?;
    info!("Echo server listening on {local_addr}");

    // Handle SIGINT by stopping the accept loop
    if let Some(stop_handle) = endpoint.stop_handle() {
        if let Err(e) = ctrlc::set_handler(move || stop_handle.stop()) {
            warn!("Echo server can only be stopped by killing the process: {e}");
        }
    }

    endpoint.accept_loop()
}

fn run_client(settings: EchoSettings) -> SocketResult<()> {
    let message = settings.message.clone();
    let endpoint = Endpoint::new(
        move |connection: Connection| {
            if let Some(reply) = handlers::request(connection, &message) {
                println!("{reply}");
            }
        },
        settings.endpoint,
    )?;
    endpoint.connect(&settings.address, settings.port)
}

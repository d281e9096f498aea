use argh::FromArgs;
use captcha_solver::server::UPLOAD_FIELD;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};

// defaults for the client
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 3000;

#[derive(FromArgs)]
/// Captcha solver client for uploading captchas and checking the service
struct ClientArgs {
    /// the host to connect to
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to connect to
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// command to execute: "solve" or "health"
    #[argh(subcommand)]
    command: ClientCommands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum ClientCommands {
    Solve(SolveCommand),
    Health(HealthCommand),
}

#[derive(FromArgs)]
/// Upload a captcha image and print the answer
#[argh(subcommand, name = "solve")]
struct SolveCommand {
    /// the path to the image
    #[argh(option, short = 'i')]
    image_path: PathBuf,
}

#[derive(FromArgs)]
/// Check that the service is up
#[argh(subcommand, name = "health")]
struct HealthCommand {}

/// MIME type for an image path, guessed from its extension.
fn mime_for(path: &Path) -> &'static str {
    image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: ClientArgs = argh::from_env();

    let client = reqwest::Client::new();

    // format the host and port
    let url = format!("http://{}:{}/", args.host, args.port);

    let response = match args.command {
        ClientCommands::Solve(solve_command) => {
            let image_path = solve_command.image_path;
            let bytes = tokio::fs::read(&image_path).await?;
            let file_name = image_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "captcha".to_string());

            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str(mime_for(&image_path))?;

            client
                .post(&url)
                .multipart(Form::new().part(UPLOAD_FIELD, part))
                .send()
                .await?
        }
        ClientCommands::Health(_) => client.get(&url).send().await?,
    };

    let status = response.status();
    let result = response.json::<serde_json::Value>().await?;
    println!("Status: {status}");
    println!("Result: {}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

use clap::{Args, Subcommand, ValueEnum};
use rescue_core::{Location, NewRequest, RequestStatus, RescueRequest, Urgency};
use uuid::Uuid;

use crate::app::App;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct RequestCommand {
    #[command(subcommand)]
    pub command: RequestSubcommand,
}

#[derive(Subcommand)]
pub enum RequestSubcommand {
    /// Raise a new rescue request
    Create {
        /// What is happening and what help is needed
        description: String,

        /// Urgency (low, medium, high, critical)
        #[arg(long, short, default_value = "medium")]
        urgency: String,

        /// Number of people needing help
        #[arg(long, short, default_value_t = 1)]
        people: u32,

        /// Latitude in decimal degrees
        #[arg(long, requires = "lon", allow_negative_numbers = true)]
        lat: Option<f64>,

        /// Longitude in decimal degrees
        #[arg(long, requires = "lat", allow_negative_numbers = true)]
        lon: Option<f64>,

        /// Free-form place description
        #[arg(long)]
        place: Option<String>,
    },

    /// List requests
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Filter by status (pending, assigned, in-progress, completed)
        #[arg(long)]
        status: Option<String>,

        /// Only requests not yet accepted by the server
        #[arg(long)]
        unsynced: bool,
    },

    /// Show a request's details
    Show {
        /// Request ID (UUID)
        id: String,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Accept a request and start working on it
    Accept {
        /// Request ID (UUID)
        id: String,
    },

    /// Mark a request as completed
    Complete {
        /// Request ID (UUID)
        id: String,
    },
}

impl RequestCommand {
    pub fn is_write(&self) -> bool {
        !matches!(
            self.command,
            RequestSubcommand::List { .. } | RequestSubcommand::Show { .. }
        )
    }

    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            RequestSubcommand::Create {
                description,
                urgency,
                people,
                lat,
                lon,
                place,
            } => {
                let urgency: Urgency = urgency.parse().map_err(|e: String| e)?;
                let mut input = NewRequest::new(description, urgency).with_people_count(*people);
                if let Some(location) = build_location(*lat, *lon, place.as_deref()) {
                    input = input.with_location(location);
                }

                let created = app.service.create_request(&app.user, input).await?;
                println!("Created request:\n");
                print!("{}", created);
                Ok(())
            }
            RequestSubcommand::List {
                format,
                status,
                unsynced,
            } => {
                let status: Option<RequestStatus> = status
                    .as_deref()
                    .map(str::parse)
                    .transpose()
                    .map_err(|e: String| e)?;

                let requests: Vec<RescueRequest> = app
                    .service
                    .list()
                    .await?
                    .into_iter()
                    .filter(|r| status.map_or(true, |s| r.status == s))
                    .filter(|r| !*unsynced || !r.synced)
                    .collect();

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&requests)?);
                    }
                    OutputFormat::Text => print_table(&requests),
                }
                Ok(())
            }
            RequestSubcommand::Show { id, format } => {
                let request = app.service.get(parse_id(id)?).await?;
                let tasks = app.service.tasks_for_request(request.id).await?;

                match format {
                    OutputFormat::Json => {
                        let value = serde_json::json!({ "request": request, "tasks": tasks });
                        println!("{}", serde_json::to_string_pretty(&value)?);
                    }
                    OutputFormat::Text => {
                        print!("{}", request);
                        if !tasks.is_empty() {
                            println!("\nVolunteers:");
                            for task in &tasks {
                                println!(
                                    "  {} since {}{}",
                                    task.volunteer_id,
                                    task.assigned_at.format("%Y-%m-%d %H:%M"),
                                    if task.is_completed() { " (done)" } else { "" }
                                );
                            }
                        }
                    }
                }
                Ok(())
            }
            RequestSubcommand::Accept { id } => {
                let request = app.service.accept(&app.user, parse_id(id)?).await?;
                println!("Request {} is now {}", request.id, request.status);
                Ok(())
            }
            RequestSubcommand::Complete { id } => {
                let request = app.service.complete(&app.user, parse_id(id)?).await?;
                println!("Request {} is now {}", request.id, request.status);
                Ok(())
            }
        }
    }
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, String> {
    Uuid::parse_str(raw).map_err(|_| format!("Invalid request ID: {}", raw))
}

fn build_location(lat: Option<f64>, lon: Option<f64>, place: Option<&str>) -> Option<Location> {
    match (lat, lon, place) {
        (Some(lat), Some(lon), Some(place)) => Some(Location::new(lat, lon).with_label(place)),
        (Some(lat), Some(lon), None) => Some(Location::new(lat, lon).with_label("GPS Coordinates")),
        (_, _, Some(place)) => Some(Location::manual_entry().with_label(place)),
        _ => None,
    }
}

fn print_table(requests: &[RescueRequest]) {
    if requests.is_empty() {
        println!("No requests found.");
        return;
    }

    println!(
        "{:<36}  {:<8}  {:<11}  {:<12}  {:>6}  SYNC",
        "ID", "URGENCY", "STATUS", "CATEGORY", "PEOPLE"
    );
    for r in requests {
        println!(
            "{:<36}  {:<8}  {:<11}  {:<12}  {:>6}  {}",
            r.id,
            r.urgency,
            r.status,
            truncate(&r.category, 12),
            r.people_count,
            if r.synced { "yes" } else { "pending" }
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{}…", cut)
    }
}

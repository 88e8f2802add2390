use clap::{Args, Subcommand};
use rescue_core::VolunteerTask;

use super::request::{parse_id, OutputFormat};
use crate::app::App;

#[derive(Args)]
pub struct TaskCommand {
    #[command(subcommand)]
    pub command: TaskSubcommand,
}

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Assign a volunteer to a request
    Assign {
        /// Request ID (UUID)
        request_id: String,

        /// Volunteer to assign (defaults to yourself)
        #[arg(long)]
        volunteer: Option<String>,

        /// Notes for the volunteer
        #[arg(long)]
        notes: Option<String>,
    },

    /// List volunteer tasks
    List {
        /// Only tasks for this request
        #[arg(long, conflicts_with = "volunteer")]
        request: Option<String>,

        /// Only tasks for this volunteer (defaults to yourself)
        #[arg(long)]
        volunteer: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl TaskCommand {
    pub fn is_write(&self) -> bool {
        matches!(self.command, TaskSubcommand::Assign { .. })
    }

    pub async fn run(&self, app: &App) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            TaskSubcommand::Assign {
                request_id,
                volunteer,
                notes,
            } => {
                let volunteer_id = volunteer.as_deref().unwrap_or(&app.user.id);
                let task = app
                    .service
                    .assign_task(&app.user, parse_id(request_id)?, volunteer_id, notes.clone())
                    .await?;
                println!(
                    "Assigned {} to request {} (task {})",
                    task.volunteer_id, task.request_id, task.id
                );
                Ok(())
            }
            TaskSubcommand::List {
                request,
                volunteer,
                format,
            } => {
                let tasks = match request {
                    Some(id) => app.service.tasks_for_request(parse_id(id)?).await?,
                    None => {
                        let volunteer_id = volunteer.as_deref().unwrap_or(&app.user.id);
                        app.service.tasks_for_volunteer(volunteer_id).await?
                    }
                };

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&tasks)?);
                    }
                    OutputFormat::Text => print_tasks(&tasks),
                }
                Ok(())
            }
        }
    }
}

fn print_tasks(tasks: &[VolunteerTask]) {
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    for task in tasks {
        let state = if task.is_completed() { "done" } else { "open" };
        println!(
            "{}  request {}  {}  {}  {}",
            task.id,
            task.request_id,
            task.volunteer_id,
            state,
            if task.synced { "synced" } else { "pending" }
        );
        if let Some(notes) = &task.notes {
            println!("    {}", notes);
        }
    }
}

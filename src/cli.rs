use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a food photo: dish, ingredients, nutrition
    Analyze {
        /// Path to the image file (JPEG, PNG or WEBP)
        #[arg(short, long)]
        image_file: String,

        /// User identifier attached to the response
        #[arg(short, long, default_value = "guest")]
        user_id: String,

        /// Extra instructions merged into the description prompt
        #[arg(long)]
        prompt: Option<String>,

        /// Optional recipe nutrition table consulted before the model
        #[arg(long)]
        recipes_csv: Option<String>,
    },
    /// Recalculate nutrition from an edited ingredient-line file
    Recalculate {
        /// Path to a text file of "Name | Qty | Unit | Reason" lines
        #[arg(short, long)]
        ingredients_file: String,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

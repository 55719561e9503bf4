//! The `assessforge init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    // Create assessforge.toml
    if std::path::Path::new("assessforge.toml").exists() {
        println!("assessforge.toml already exists, skipping.");
    } else {
        std::fs::write("assessforge.toml", SAMPLE_CONFIG)?;
        println!("Created assessforge.toml");
    }

    // Create example question sheet
    let sheet_path = std::path::Path::new("questions.csv");
    if sheet_path.exists() {
        println!("questions.csv already exists, skipping.");
    } else {
        std::fs::write(sheet_path, EXAMPLE_SHEET)?;
        println!("Created questions.csv");
    }

    println!("\nNext steps:");
    println!("  1. Edit assessforge.toml with your storage and backend URLs");
    println!("  2. Run: assessforge import --sheet questions.csv --output assignment.json");
    println!("  3. Run: assessforge validate --document assignment.json");
    println!(
        "  4. Run: assessforge submit --document assignment.json --title \"Unit 1\" --due 2030-01-01T09:00:00Z --skill reading"
    );

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# assessforge configuration

[storage]
# Relative audio paths are resolved against this public base URL.
base_url = "https://storage.example.com/assessforge"

[backend]
type = "mock"
# type = "http"
# base_url = "https://api.example.com"
# api_token = "${ASSESSFORGE_API_TOKEN}"

[drafts]
dir = "./.assessforge/drafts"
namespace = "assessforge-draft"
"#;

const EXAMPLE_SHEET: &str = r#"Type,Question,A,B,C,D,Answer,Points,Explanation,Passage,Audio
multiple_choice,What does the narrator find in the attic?,A map,A letter,A key,A photo,B,2,The second paragraph mentions the letter.,"The attic was dusty. Under the boards lay a letter addressed to no one.",
true_false,The letter was addressed to the narrator.,,,,,FALSE,1,,,
fill_in_blank,The attic was ___.,,,,,dusty,1,,,
short_answer,Who do you think wrote the letter?,,,,,,3,,,
multiple_choice,Where does the conversation take place?,At a station,In a cafe,At school,At home,A,2,,,audio/conversation.mp3
speaking,Retell the conversation in your own words.,,,,,,5,,,
"#;

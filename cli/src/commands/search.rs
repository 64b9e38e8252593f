use anyhow::Result;
use std::process;

use crate::openfoodfacts::OpenFoodFactsClient;
use stride_core::models::FoodItem;

use super::helpers::print_food_table;

/// Search OpenFoodFacts by name. An unreachable service shows up as an
/// empty result, same as no matches.
pub(crate) fn cmd_search(off: &OpenFoodFactsClient, query: &str, json: bool) -> Result<()> {
    let results = off.search(query);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        eprintln!("No results for '{query}'");
        process::exit(2);
    }

    let refs: Vec<&FoodItem> = results.iter().collect();
    print_food_table(&refs, false);
    eprintln!("Log one with: stride log \"{query}\" --meal <meal>");
    Ok(())
}

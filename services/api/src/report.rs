use crate::cli::DataArgs;
use crate::infra::build_service;
use appraisal_comps::config::AppConfig;
use appraisal_comps::error::AppError;
use appraisal_comps::valuation::{AccountNumber, AnalysisResult, Property};
use clap::Args;

#[derive(Args, Debug)]
pub(crate) struct SearchArgs {
    /// Street address fragment to match (case-insensitive)
    pub(crate) query: String,
    #[command(flatten)]
    pub(crate) data: DataArgs,
}

#[derive(Args, Debug)]
pub(crate) struct AnalyzeArgs {
    /// Account number of the property under protest
    pub(crate) account: String,
    #[command(flatten)]
    pub(crate) data: DataArgs,
    /// Print the JSON payload served by /api/property instead of a report
    #[arg(long)]
    pub(crate) json: bool,
}

pub(crate) fn run_search(args: SearchArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config, args.data.path)?;
    let matches = service.search(&args.query)?;

    print!("{}", render_search(&args.query, &matches));
    Ok(())
}

pub(crate) fn run_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_service(&config, args.data.path)?;
    let result = service.analyze(&AccountNumber::new(&args.account))?;

    if args.json {
        let payload = serde_json::to_string_pretty(&result)
            .map_err(|err| AppError::Io(std::io::Error::other(err)))?;
        println!("{payload}");
    } else {
        print!("{}", render_analysis(&result));
    }
    Ok(())
}

pub(crate) fn render_search(query: &str, matches: &[Property]) -> String {
    let query = query.trim();
    if matches.is_empty() {
        return format!("No properties match '{query}'\n");
    }

    let mut out = format!("Properties matching '{query}'\n");
    for property in matches {
        out.push_str(&format!(
            "- {} | {} | {:.0} sq ft | appraised ${:.0}\n",
            property.account_number,
            property.street_address,
            property.building_area,
            property.total_appraised_value
        ));
    }
    out
}

pub(crate) fn render_analysis(result: &AnalysisResult) -> String {
    let reference = result.reference_property();
    let analysis = result.value_analysis();
    let grade = reference
        .grade
        .as_ref()
        .map(|grade| grade.code())
        .unwrap_or("n/a");

    let mut out = String::from("Comparable analysis\n");
    out.push_str(&format!(
        "Reference: {} ({}) | {:.0} sq ft | CDU {} | grade {}\n",
        reference.street_address,
        reference.account_number,
        reference.building_area,
        reference.cdu,
        grade
    ));
    out.push_str(&format!(
        "Appraised value: ${:.0}\n",
        reference.total_appraised_value
    ));

    if result.num_comps_found() == 0 {
        out.push_str("\nNo comparable properties found\n");
        return out;
    }

    out.push_str(&format!(
        "\nLowest {} of {} comparables\n",
        analysis.lowest_five_comps().len(),
        result.num_comps_found()
    ));
    for comp in analysis.lowest_five_comps() {
        out.push_str(&format!(
            "- {} ({}) | {:.0} sq ft | CDU {} (x{:.3}) | adjusted ${:.0} | ${:.2}/sq ft\n",
            comp.property.street_address,
            comp.property.account_number,
            comp.property.building_area,
            comp.property.cdu,
            comp.cdu_factor * comp.grade_factor,
            comp.cdu_adjusted_value,
            comp.price_per_sqft
        ));
    }

    if let (Some(median), Some(final_value), Some(reduction)) = (
        analysis.median_price_per_sqft(),
        analysis.final_adjusted_value(),
        analysis.potential_reduction(),
    ) {
        out.push_str(&format!("\nMedian price per sq ft: ${median:.2}\n"));
        out.push_str(&format!("Suggested market value: ${final_value:.0}\n"));
        out.push_str(&format!("Potential reduction: ${reduction:.0}\n"));
    }
    out
}

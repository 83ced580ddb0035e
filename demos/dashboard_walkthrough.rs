use chrono::{Months, NaiveDate};
use consultant_dashboard::*;
use std::sync::Arc;

const RATES_CSV: &str = "\
Consultant,Date_applied,SF_flat,SF_pct
DEFAULT,2021-01-01,0,10
Priya,2022-01-01,20,6
Marco,2022-09-01,0,7.5
";

fn sales_rows() -> Vec<SalesRow> {
    let names = ["Priya", "Marco", "Lena", "Tom", "Aiko", "Sam", "Rafa"];
    let start = NaiveDate::from_ymd_opt(2021, 7, 1).unwrap();
    let mut rows = Vec::new();
    for offset in 0..24u32 {
        let month = start.checked_add_months(Months::new(offset)).unwrap();
        for (i, name) in names.iter().enumerate() {
            let gross = 4000.0 + 650.0 * i as f64 + 120.0 * ((offset * 5 + i as u32) % 7) as f64;
            rows.push(SalesRow {
                month,
                consultant: name.to_string(),
                gross_sales: gross,
                cost_of_sales: gross * 0.6,
                commission: 250.0 + gross * 0.12 - 15.0 * (i as f64),
            });
        }
    }
    rows
}

fn print_view(view: &ChartView) {
    println!("\n== {} ==", view.title);
    println!("   axis: {}", view.axis.join(", "));
    for trace in &view.traces {
        let values: Vec<String> = trace
            .values
            .iter()
            .map(|v| v.map(|x| format!("{:.0}", x)).unwrap_or_else(|| "-".to_string()))
            .collect();
        let marker = if trace.highlighted { "*" } else { " " };
        println!(" {} {:<14} {}", marker, trace.name, values.join(" "));
    }
    if let Some(Annotation::ReferenceLine { label, .. }) = &view.annotation {
        println!("   reference line at {}", label);
    }
}

fn main() {
    let rates: Vec<RateRow> = csv::Reader::from_reader(RATES_CSV.as_bytes())
        .deserialize()
        .collect::<std::result::Result<_, _>>()
        .expect("rate table should parse");

    let dataset = Dataset::from_rows(&sales_rows(), &rates, DashboardConfig::default())
        .expect("dataset should load");
    let dataset = Arc::new(dataset);

    println!(
        "Loaded {} records for {} consultants",
        dataset.records().len(),
        dataset.consultants().len()
    );

    let mut session = DashboardSession::new(Arc::clone(&dataset)).expect("session");
    println!("{}", session.window_label().unwrap());

    session.set_top_n(true);
    let primary = session.render_primary(Some(1)).expect("primary chart");
    print_view(&primary.view);

    let margin = session.render_margin(&primary, Some(1)).expect("margin chart");
    print_view(&margin);

    let snapshot_month = dataset.months().find("Mar 2023").expect("month on record");
    print_view(
        &session
            .monthly_snapshot(snapshot_month, Metric::ServiceFee)
            .expect("snapshot"),
    );

    print_view(&session.consultant_history(None).expect("history"));
    print_view(&session.year_to_date(2022).expect("ytd"));
    print_view(
        &session
            .financial_year_comparison("Priya", Metric::Commission)
            .expect("financial years"),
    );

    session.drill_down(Some("Marco")).expect("drill down");
    let single = session.render_primary(None).expect("single chart");
    print_view(&single.view);
    print_view(&session.render_margin(&single, Some(0)).expect("margin"));

    let first = &dataset.records()[0].rounded();
    println!(
        "\nFirst record: {} {} fee {} paid {} margin {:?}",
        first.month_label, first.consultant, first.service_fee, first.commission_paid, first.margin
    );
}

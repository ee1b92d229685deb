// tests/analyze_e2e.rs
use std::path::Path;
use std::sync::Arc;

use value_analyzer::acquire::{load_raw_records, StaticListings};
use value_analyzer::ai_adapter::{DynTextGenerator, MockGenerator};
use value_analyzer::analyze::report::MatchVerdict;
use value_analyzer::analyze::{default_weights, ImportanceResolver, LocalHeuristic, WeightSource};
use value_analyzer::{AnalyzeError, Analyzer, RawRecord, WeightMap};

fn sample_path() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data/sample_products.json"))
}

fn local_analyzer() -> Analyzer {
    Analyzer::new(ImportanceResolver::local_only().with_heuristic(LocalHeuristic::without_jitter()))
}

#[tokio::test]
async fn sample_laptops_rank_cheapest_first_offline() {
    let raws = load_raw_records(sample_path()).expect("sample products");
    assert_eq!(raws.len(), 3);

    let report = local_analyzer().analyze(&raws, None).await.unwrap();
    assert_eq!(report.weight_source, WeightSource::Local);
    assert!(report.local_mode);
    assert!(report.is_degraded());

    // Every feature appears in all three listings, and every one is weighted.
    assert_eq!(report.common_features.len(), 5);
    let weighted: Vec<_> = report.weights.keys().collect();
    let observed = default_weights(&report.records);
    assert_eq!(weighted, observed.keys().collect::<Vec<_>>());
    assert_eq!(report.weights["CPU"], 3.0);
    assert_eq!(report.weights["Storage"], 1.3);
    assert_eq!(report.weights["Battery"], 3.0);
    assert_eq!(report.weights["Weight"], 1.8);

    let order: Vec<_> = report.ranking.iter().map(|s| s.record.name.as_str()).collect();
    assert_eq!(order, vec!["ASUS VivoBook 14", "Dell XPS 13 Plus", "MacBook Pro 14 M3"]);
    assert_eq!(report.recommendations[0].rank, 1);
    assert!(report.summary.starts_with("Recommend ASUS VivoBook 14"));

    let stats = report.stats.as_ref().expect("stats for non-empty run");
    assert_eq!(stats.cheapest.name, "ASUS VivoBook 14");
    assert_eq!(stats.most_expensive.name, "MacBook Pro 14 M3");
    assert_eq!(stats.price_range, (18900.0, 39900.0));

    assert_eq!(report.comparison.len(), 3);
    assert_eq!(report.breakdowns.len(), 3);
}

#[tokio::test]
async fn provider_weights_flow_into_the_report() {
    let mock = MockGenerator::new("```json\n{\"CPU\": 2, \"RAM\": 3}\n```");
    let resolver = ImportanceResolver::new(Some(Arc::new(mock) as DynTextGenerator))
        .with_heuristic(LocalHeuristic::without_jitter());
    let analyzer = Analyzer::new(resolver);

    let raws = load_raw_records(sample_path()).unwrap();
    let report = analyzer.analyze(&raws, Some("long battery")).await.unwrap();

    assert_eq!(report.weight_source, WeightSource::Ai);
    assert!(!report.local_mode);
    assert!(!report.is_degraded());
    assert_eq!(report.weights["CPU"], 2.0);
    assert_eq!(report.weights["RAM"], 3.0);
    // Back-filled from the heuristic.
    assert_eq!(report.weights["Battery"], 3.0);
    assert_eq!(report.weights.len(), 5);
}

#[tokio::test]
async fn requirement_keywords_drive_match_scores() {
    let raws = load_raw_records(sample_path()).unwrap();
    let report = local_analyzer()
        .analyze(&raws, Some("ryzen battery ok"))
        .await
        .unwrap();

    let asus = &report.match_scores["https://shop.example/asus-vivobook-14"];
    assert_eq!(asus.score, 70);
    assert_eq!(asus.matched_keywords, vec!["ryzen".to_string(), "battery".to_string()]);
    assert_eq!(asus.verdict, MatchVerdict::Consider);

    let mac = &report.match_scores["https://shop.example/macbook-pro-14-m3"];
    assert_eq!(mac.score, 60);
}

#[tokio::test]
async fn unreachable_locators_are_skipped() {
    let listings = StaticListings::from_json_file(sample_path()).unwrap();
    let mut locators = listings.locators();
    locators.push("https://shop.example/gone".to_string());

    let report = local_analyzer()
        .analyze_locators(&listings, &locators, None)
        .await
        .unwrap();
    assert_eq!(report.records.len(), 3);
}

#[tokio::test]
async fn nothing_fetched_means_nothing_to_analyze() {
    let listings = StaticListings::new(Vec::<RawRecord>::new());
    let err = local_analyzer()
        .analyze_locators(&listings, &["https://shop.example/gone".to_string()], None)
        .await
        .unwrap_err();
    assert_eq!(err, AnalyzeError::NoUsableRecords);
}

#[tokio::test]
async fn manual_weights_replace_the_estimate() {
    let analyzer = local_analyzer();
    let raws = load_raw_records(sample_path()).unwrap();
    let first = analyzer.analyze(&raws, None).await.unwrap();

    let manual: WeightMap = [("RAM".to_string(), 3.0)].into_iter().collect();
    let again = analyzer.rescore(first.records.clone(), manual, None);

    assert_eq!(again.weight_source, WeightSource::Manual);
    assert_eq!(again.weights.len(), 1);
    // Only RAM counts now; the Dell doubles everyone else's.
    assert_eq!(again.ranking[0].record.name, "Dell XPS 13 Plus");
    // Unweighted features contribute nothing to the breakdown.
    let dell = &again.breakdowns["https://shop.example/dell-xps-13-plus"];
    assert_eq!(dell.len(), 1);
}

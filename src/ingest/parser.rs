//! Fuses the XHR rows and the HTML page into normalized `Court` records.

use chrono::Utc;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;
use tracing::trace;
use url::Url;

use crate::ingest::model::{BenchType, CaseFooter, Court, collapse_whitespace};

static COURT_NO_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*COURT\s*NO:?\s*").unwrap());
static FIRST_INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Parses the XHR rows against the HTML document, dropping any row that has
/// no `courtcode` or no matching DOM card.
pub fn parse_courts(rows: &[Value], html: &str, base_url: &str) -> Vec<Court> {
    let document = Html::parse_document(html);
    let mut courts = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(court_code) = row.get("courtcode").and_then(Value::as_str) else {
            trace!("dropping row without courtcode");
            continue;
        };

        let card_selector = match Selector::parse(&format!("#dv_{court_code}")) {
            Ok(s) => s,
            Err(_) => continue,
        };
        let Some(card) = document.select(&card_selector).next() else {
            trace!(court_code, "dropping row with no matching card");
            continue;
        };

        let case_info = row.get("caseinfo").and_then(Value::as_str).unwrap_or("");
        let gsrno = row.get("gsrno").and_then(Value::as_str).unwrap_or("");

        courts.push(parse_card(court_code, case_info, gsrno, card, &document, base_url));
    }

    courts
}

/// Extract the inner HTML of a court's card, used by the `DeltaEngine` for
/// its cheap per-tick hash. Returns `None` if no matching card.
pub fn card_inner_html(html: &str, court_code: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(&format!("#dv_{court_code}")).ok()?;
    document.select(&selector).next().map(|el| el.inner_html())
}

fn parse_card(
    court_code: &str,
    case_info: &str,
    gsrno: &str,
    card: ElementRef,
    document: &Html,
    base_url: &str,
) -> Court {
    let judge_name = judge_name(card);
    let stream_url = stream_url(card, base_url);
    let judge_photos = judge_photos(card, base_url);
    let bench_type = if judge_photos.len() >= 2 {
        BenchType::DivisionBench
    } else {
        BenchType::SingleBench
    };
    let court_number = court_number(document, court_code);
    let sr_no = clean_sr_no(gsrno);
    let queue_position = sr_no
        .as_deref()
        .and_then(|s| FIRST_INT.find(s))
        .and_then(|m| m.as_str().parse::<i32>().ok());

    let raw_case_info = collapse_whitespace(case_info);
    let footer = CaseFooter::parse(&raw_case_info);
    let case_number = footer.case_number().map(str::to_string);
    let case_status = footer.case_status();
    let case_type = footer.case_type();

    let is_live = select_any(card, ".blink_me").is_some();
    let is_active = is_live
        || matches!(
            case_status,
            Some(crate::ingest::model::CaseStatus::InSession)
                | Some(crate::ingest::model::CaseStatus::Recess)
        );

    Court {
        court_code: court_code.to_string(),
        court_number,
        judge_name,
        bench_type,
        judge_count: judge_photos.len().max(1),
        judge_photos,
        case_number,
        case_status,
        case_type,
        raw_case_info,
        sr_no,
        queue_position,
        has_stream: stream_url.is_some(),
        stream_url,
        is_live,
        is_active,
        scraped_at: Utc::now(),
    }
}

fn judge_name(card: ElementRef) -> Option<String> {
    if let Some(el) = select_any(card, ".card-category b") {
        let text = trim_live_tag(&text_of(el));
        if !text.is_empty() {
            return Some(text);
        }
    }
    for selector in [".card-header", ".card-title", ".card-body"] {
        if let Some(el) = select_any(card, selector) {
            let text = trim_live_tag(&text_of(el));
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

fn trim_live_tag(text: &str) -> String {
    text.replace("[Live]", "").trim().to_string()
}

fn stream_url(card: ElementRef, base_url: &str) -> Option<String> {
    let selector = Selector::parse("a").ok()?;
    let href = card.select(&selector).find_map(|a| a.value().attr("href"))?;
    Some(resolve_leading_slash(href, base_url))
}

fn judge_photos(card: ElementRef, base_url: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(".photoclass, img") else {
        return Vec::new();
    };
    card.select(&selector)
        .filter_map(|el| {
            el.value()
                .attr("src")
                .or_else(|| el.value().attr("data-src"))
        })
        .map(|src| resolve_relative(src, base_url))
        .collect()
}

fn resolve_leading_slash(href: &str, base_url: &str) -> String {
    if let Some(stripped) = href.strip_prefix('/') {
        if let Ok(base) = Url::parse(base_url) {
            if let Some(origin) = base.host_str() {
                return format!("{}://{}/{}", base.scheme(), origin, stripped);
            }
        }
    }
    href.to_string()
}

fn resolve_relative(src: &str, base_url: &str) -> String {
    let stripped = src.strip_prefix("./").unwrap_or(src);
    if let Ok(base) = Url::parse(base_url) {
        if let Ok(joined) = base.join(stripped) {
            return joined.to_string();
        }
    }
    stripped.to_string()
}

fn court_number(document: &Html, court_code: &str) -> Option<String> {
    let selector = Selector::parse(&format!("#court_{court_code}")).ok()?;
    let el = document.select(&selector).next()?;
    let text = text_of(el);
    let stripped = COURT_NO_PREFIX.replace(&text, "");
    let trimmed = stripped.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn clean_sr_no(gsrno: &str) -> Option<String> {
    let cleaned = collapse_whitespace(gsrno);
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn select_any<'a>(scope: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    scope.select(&selector).next()
}

fn text_of(el: ElementRef) -> String {
    collapse_whitespace(&el.text().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const BASE: &str = "https://court.example.org/board";

    fn html_fixture(extra_court_number: &str) -> String {
        format!(
            r#"
            <html><body>
                <div id="court_5">{extra_court_number}</div>
                <div id="dv_5">
                    <div class="card-category"><b>J. A. Smith</b></div>
                    <a href="/stream/5">watch</a>
                    <img class="photoclass" src="./photos/a.jpg" />
                    <span class="blink_me">LIVE</span>
                </div>
            </body></html>
            "#
        )
    }

    #[test]
    fn s1_cold_first_tick_parses_in_session_case() {
        let rows = vec![json!({
            "courtcode": "5",
            "caseinfo": "SCA/1/2024",
            "gsrno": "SR 7",
        })];
        let html = html_fixture("COURT NO: 5");
        let courts = parse_courts(&rows, &html, BASE);

        assert_eq!(courts.len(), 1);
        let court = &courts[0];
        assert_eq!(court.queue_position, Some(7));
        assert_eq!(
            court.case_status,
            Some(crate::ingest::model::CaseStatus::InSession)
        );
        assert_eq!(court.case_number.as_deref(), Some("SCA/1/2024"));
        assert_eq!(court.judge_name.as_deref(), Some("J. A. Smith"));
        assert_eq!(court.court_number.as_deref(), Some("5"));
        assert!(court.is_live);
        assert!(court.is_active);
        assert_eq!(court.stream_url.as_deref(), Some("https://court.example.org/stream/5"));
    }

    #[test]
    fn row_without_courtcode_is_dropped() {
        let rows = vec![json!({ "caseinfo": "x", "gsrno": "1" })];
        let html = html_fixture("COURT NO: 5");
        assert!(parse_courts(&rows, &html, BASE).is_empty());
    }

    #[test]
    fn row_without_matching_card_is_dropped() {
        let rows = vec![json!({ "courtcode": "99", "caseinfo": "x", "gsrno": "1" })];
        let html = html_fixture("COURT NO: 5");
        assert!(parse_courts(&rows, &html, BASE).is_empty());
    }

    #[test]
    fn sitting_over_case_insensitive_after_whitespace_collapse() {
        let footer = CaseFooter::parse("  court   sitting  over  ");
        assert_eq!(footer, CaseFooter::SittingOver);
        assert_eq!(footer.case_number(), None);
    }

    #[test]
    fn recess_strips_marker_from_footer() {
        let footer = CaseFooter::parse("SCA/9/2024 (RECESS)");
        assert_eq!(
            footer,
            CaseFooter::Recess {
                case_number: "SCA/9/2024".to_string()
            }
        );
    }

    #[test]
    fn empty_or_dash_footer_is_empty() {
        assert_eq!(CaseFooter::parse(""), CaseFooter::Empty);
        assert_eq!(CaseFooter::parse("-"), CaseFooter::Empty);
    }
}

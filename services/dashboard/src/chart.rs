//! Scatter plot of deck performance, rendered as a Plotly figure
//!
//! x = total appearances, y = top-4 rate, one trace per category. The page
//! loads plotly.js from its CDN and draws the embedded figure JSON.

use crate::performance::{Category, PerformanceReport};
use serde_json::{json, Value};

const PLOTLY_CDN: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";
const PAGE_TITLE: &str = "Deck Performance - Top 4 Conversion";
const BACKGROUND: &str = "rgb(30, 30, 30)";

fn color(category: Category) -> &'static str {
    match category {
        Category::Toppers => "rgb(255, 0, 0)",
        Category::HiddenGems => "rgb(0, 255, 0)",
        Category::FanFavorites => "rgb(0, 0, 255)",
        Category::Cringes => "rgb(128, 128, 128)",
    }
}

fn reference_line(x: (f64, f64), y: (f64, f64), xref: &str, yref: &str) -> Value {
    json!({
        "type": "line",
        "xref": xref,
        "yref": yref,
        "x0": x.0,
        "x1": x.1,
        "y0": y.0,
        "y1": y.1,
        "opacity": 0.5,
        "line": { "color": "white", "dash": "dash" }
    })
}

/// Plotly figure (`{data, layout}`) for the report
pub fn figure(report: &PerformanceReport) -> Value {
    let traces: Vec<Value> = Category::ALL
        .iter()
        .map(|&category| {
            let decks: Vec<_> = report
                .decks
                .iter()
                .filter(|d| d.category == category)
                .collect();
            json!({
                "type": "scatter",
                "mode": "markers",
                "name": category.label(),
                "x": decks.iter().map(|d| d.total_appearances).collect::<Vec<_>>(),
                "y": decks.iter().map(|d| d.top4_rate).collect::<Vec<_>>(),
                "text": decks.iter().map(|d| d.deck.as_str()).collect::<Vec<_>>(),
                "customdata": decks.iter().map(|d| d.top4_count).collect::<Vec<_>>(),
                "marker": {
                    "size": decks.iter().map(|d| d.total_appearances * 3).collect::<Vec<_>>(),
                    "color": color(category),
                    "opacity": 0.6,
                    "line": { "width": 1, "color": "DarkSlateGrey" }
                },
                "hovertemplate": "<b>%{text}</b><br>Total appearances: %{x}<br>\
                                  Top-4 rate: %{y:.2f}%<br>Top-4 count: %{customdata}<br>\
                                  <extra></extra>"
            })
        })
        .collect();

    let mean = report.popularity_threshold;
    json!({
        "data": traces,
        "layout": {
            "xaxis": { "title": { "text": "Total appearances" } },
            "yaxis": { "title": { "text": "Top-4 conversion rate (%)" } },
            "plot_bgcolor": BACKGROUND,
            "paper_bgcolor": BACKGROUND,
            "font": { "color": "white" },
            "showlegend": true,
            "legend": {
                "yanchor": "top",
                "y": 1.05,
                "xanchor": "left",
                "x": -0.2,
                "bgcolor": "rgba(0,0,0,0.5)"
            },
            "height": 800,
            "shapes": [
                reference_line((0.0, 1.0), (report.rate_threshold, report.rate_threshold), "paper", "y"),
                reference_line((mean, mean), (0.0, 1.0), "x", "paper"),
            ]
        }
    })
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn page_shell(body: &str, head_extra: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
{head_extra}<style>
body {{ background: {bg}; color: white; font-family: sans-serif; margin: 2rem; }}
ul.categories {{ columns: 2; }}
.empty {{ padding: 1rem; border: 1px solid #aa8800; background: #332a00; }}
</style>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>
"#,
        title = PAGE_TITLE,
        bg = BACKGROUND,
        head_extra = head_extra,
        body = body,
    )
}

/// Full page with the chart and the category legend
pub fn render_page(report: &PerformanceReport) -> String {
    // `</` would end the script element early if a deck name contained it
    let figure_json = figure(report).to_string().replace("</", "<\\/");

    let legend: String = Category::ALL
        .iter()
        .map(|c| format!("<li><b>{}</b>: {}</li>\n", c.label(), escape_html(c.description())))
        .collect();

    let body = format!(
        r#"<div id="chart"></div>
<h3>Deck categories</h3>
<ul class="categories">
{legend}</ul>
<script>
const figure = {figure_json};
Plotly.newPlot("chart", figure.data, figure.layout, {{ responsive: true }});
</script>"#,
    );

    page_shell(&body, &format!("<script src=\"{}\"></script>\n", PLOTLY_CDN))
}

/// Page shown instead of the chart when there is nothing to plot
pub fn render_empty(message: &str) -> String {
    page_shell(
        &format!(r#"<p class="empty">{}</p>"#, escape_html(message)),
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::DeckPerformance;
    use chrono::NaiveDate;

    fn deck(name: &str, total: i64, top4: i64, rate: f64, category: Category) -> DeckPerformance {
        DeckPerformance {
            deck: name.to_string(),
            total_appearances: total,
            top4_count: top4,
            top4_rate: rate,
            first_appearance: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            last_appearance: NaiveDate::from_ymd_opt(2023, 3, 1).unwrap(),
            category,
        }
    }

    fn report() -> PerformanceReport {
        PerformanceReport {
            popularity_threshold: 5.75,
            rate_threshold: 50.0,
            decks: vec![
                deck("krenko", 10, 6, 60.0, Category::Toppers),
                deck("popular", 7, 1, 14.29, Category::FanFavorites),
                deck("brewed", 4, 0, 0.0, Category::Cringes),
                deck("tymna", 2, 1, 50.0, Category::HiddenGems),
            ],
        }
    }

    // -------------------------------------------------------------------------
    // FIGURE
    // -------------------------------------------------------------------------

    #[test]
    fn test_one_trace_per_category_in_order() {
        let fig = figure(&report());
        let names: Vec<&str> = fig["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["TOPPERS", "HIDDEN GEMS", "FAN FAVORITES", "CRINGES"]);
        assert_eq!(fig["data"][0]["marker"]["color"], "rgb(255, 0, 0)");
        assert_eq!(fig["data"][3]["marker"]["color"], "rgb(128, 128, 128)");
    }

    #[test]
    fn test_points_and_marker_sizes() {
        let fig = figure(&report());
        let toppers = &fig["data"][0];
        assert_eq!(toppers["x"], json!([10]));
        assert_eq!(toppers["y"], json!([60.0]));
        assert_eq!(toppers["text"], json!(["krenko"]));
        assert_eq!(toppers["customdata"], json!([6]));
        assert_eq!(toppers["marker"]["size"], json!([30]));
    }

    #[test]
    fn test_reference_lines() {
        let fig = figure(&report());
        let shapes = fig["layout"]["shapes"].as_array().unwrap();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[0]["y0"], json!(50.0));
        assert_eq!(shapes[1]["x0"], json!(5.75));
        assert_eq!(shapes[1]["line"]["dash"], "dash");
    }

    #[test]
    fn test_dark_background() {
        let fig = figure(&report());
        assert_eq!(fig["layout"]["plot_bgcolor"], BACKGROUND);
        assert_eq!(fig["layout"]["paper_bgcolor"], BACKGROUND);
    }

    #[test]
    fn test_empty_category_still_has_trace() {
        let mut r = report();
        r.decks.retain(|d| d.category == Category::Toppers);
        let fig = figure(&r);
        assert_eq!(fig["data"].as_array().unwrap().len(), 4);
        assert_eq!(fig["data"][1]["x"], json!([]));
    }

    // -------------------------------------------------------------------------
    // PAGES
    // -------------------------------------------------------------------------

    #[test]
    fn test_page_embeds_figure_and_legend() {
        let html = render_page(&report());
        assert!(html.contains(PLOTLY_CDN));
        assert!(html.contains("Plotly.newPlot"));
        assert!(html.contains("\"krenko\""));
        assert!(html.contains("<b>HIDDEN GEMS</b>"));
        assert!(html.contains("&gt;= 50%"));
    }

    #[test]
    fn test_page_escapes_script_terminator() {
        let mut r = report();
        r.decks[0].deck = "</script><b>x".to_string();
        let html = render_page(&r);
        assert!(!html.contains("</script><b>x"));
        assert!(html.contains("<\\/script>"));
    }

    #[test]
    fn test_empty_page_has_no_chart() {
        let html = render_empty("No data found <yet>");
        assert!(html.contains("No data found &lt;yet&gt;"));
        assert!(!html.contains("Plotly.newPlot"));
        assert!(!html.contains(PLOTLY_CDN));
    }
}

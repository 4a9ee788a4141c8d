use crate::models::RawPriceRow;
use crate::scraper::PAGE_SIZE;
use anyhow::Result;
use scraper::{Html, Selector};

/// Cells a price row must carry to be read.
const PRICE_CELLS: usize = 9;

// ── Result heading ────────────────────────────────────────────────────────────

/// Total record count announced by the heading, e.g. "... Total 120 Records".
///
/// `None` when the heading carries no `Total` marker, which the site uses to
/// say the search matched nothing.
pub fn parse_record_count(heading: &str) -> Option<usize> {
    let (_, after) = heading.split_once("Total")?;
    let digits: String = after
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == ',')
        .filter(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

pub fn page_count(records: usize) -> usize {
    records.div_ceil(PAGE_SIZE)
}

// ── Price table ───────────────────────────────────────────────────────────────

/// Read every data row of the price table; the header row is skipped.
///
/// Cell order on the site: district | market | commodity | variety | grade |
/// min | max | modal | date. Rows without all nine `td > span` cells (pager
/// rows, spacer rows) are dropped.
pub fn parse_price_table(html: &str) -> Result<Vec<RawPriceRow>> {
    let doc = Html::parse_fragment(html);

    let tr_sel = Selector::parse("tr").map_err(|e| anyhow::anyhow!("tr selector: {:?}", e))?;
    let cell_sel =
        Selector::parse("td > span").map_err(|e| anyhow::anyhow!("cell selector: {:?}", e))?;

    let mut rows = Vec::new();
    for tr in doc.select(&tr_sel).skip(1) {
        let cells: Vec<String> = tr
            .select(&cell_sel)
            .map(|span| span.text().collect::<String>().trim().to_string())
            .collect();

        if cells.len() < PRICE_CELLS {
            continue;
        }

        rows.push(RawPriceRow {
            district: cells.first().cloned(),
            market: cells.get(1).cloned(),
            commodity: cells.get(2).cloned(),
            variety: cells.get(3).cloned(),
            grade: cells.get(4).cloned(),
            min_price: cells.get(5).cloned(),
            max_price: cells.get(6).cloned(),
            modal_price: cells.get(7).cloned(),
            date: cells.get(8).cloned(),
        });
    }

    Ok(rows)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Render a price table page the way the site lays it out.
    pub(crate) fn price_table(rows: &[[&str; 9]]) -> String {
        let mut html = String::from(
            r#"<table class="tableagmark_new"><tr><th>District Name</th><th>Market Name</th><th>Commodity</th><th>Variety</th><th>Grade</th><th>Min Price</th><th>Max Price</th><th>Modal Price</th><th>Price Date</th></tr>"#,
        );
        for row in rows {
            html.push_str("<tr>");
            for cell in row {
                html.push_str(&format!("<td><span>{}</span></td>", cell));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table>");
        html
    }

    #[test]
    fn test_record_count_from_heading() {
        assert_eq!(parse_record_count("Kinnow Prices in Punjab Total 120 Records"), Some(120));
        assert_eq!(parse_record_count("Market Wise Prices: Total Records:1,050"), Some(1050));
        assert_eq!(parse_record_count("No Data Found"), None);
        assert_eq!(parse_record_count("Total"), None);
    }

    #[test]
    fn test_page_count_rounds_up() {
        assert_eq!(page_count(120), 3);
        assert_eq!(page_count(50), 1);
        assert_eq!(page_count(51), 2);
        assert_eq!(page_count(0), 0);
    }

    #[test]
    fn test_parses_rows_by_position() {
        let html = price_table(&[[
            "Sri Muktsar Sahib", "Malout", "Kinnow", "Kinnow", "FAQ", "1,200", "1500", "1350", "05 Jan 2020",
        ]]);
        let rows = parse_price_table(&html).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.district.as_deref(), Some("Sri Muktsar Sahib"));
        assert_eq!(row.market.as_deref(), Some("Malout"));
        assert_eq!(row.grade.as_deref(), Some("FAQ"));
        assert_eq!(row.min_price.as_deref(), Some("1,200"));
        assert_eq!(row.date.as_deref(), Some("05 Jan 2020"));
    }

    #[test]
    fn test_skips_rows_without_full_cells() {
        let mut html = price_table(&[[
            "Fazilka", "Abohar", "Kinnow", "Kinnow", "FAQ", "900", "1100", "1000", "06 Jan 2020",
        ]]);
        html = html.replace(
            "</table>",
            r#"<tr><td colspan="9"><input type="image" src="Next.png"></td></tr><tr><td><span>partial</span></td></tr></table>"#,
        );
        let rows = parse_price_table(&html).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].market.as_deref(), Some("Abohar"));
    }
}

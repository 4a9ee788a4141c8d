//! Element identifiers on the agmarknet search page.

use crate::browser::Locator;

pub const SCRAPE_TYPE: Locator = Locator::Id("ddlArrivalPrice");
pub const COMMODITY: Locator = Locator::Id("ddlCommodity");
pub const STATE: Locator = Locator::Id("ddlState");
pub const DATE_FROM: Locator = Locator::Id("txtDate");
pub const DATE_TO: Locator = Locator::Id("txtDateTo");

pub const RESULT_HEADING: Locator = Locator::Id("cphBody_LabComName");
pub const PRICE_TABLE: Locator = Locator::XPath(r#"//table[@class="tableagmark_new"]"#);
pub const NEXT_PAGE: Locator = Locator::Css(r#"input[src*="Next.png"]"#);

pub const EXPAND: Locator = Locator::Css(r#"input[src*="plus.png"]"#);
pub const MARKET_NAMES: Locator = Locator::XPath(r#"//span[contains(@id,"MarketName")]"#);
pub const ARRIVAL_QUANTITIES: Locator = Locator::XPath(r#"//span[contains(@id,"Lab2Arrival")]"#);

/// Id fragments that name the field of an arrivals span; the rest of the id names its row.
pub const MARKET_ID_TOKEN: &str = "MarketName";
pub const QUANTITY_ID_TOKEN: &str = "Lab2Arrival";

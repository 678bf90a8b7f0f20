use crate::completion_schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Investment firm profile extracted from its public website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
#[completion_schema]
pub struct Investor {
    /// Name of the investment firm as shown on its website
    pub investor_name: String,
    /// Short description of the firm and its investment strategy; empty if the site has none
    pub investor_description: String,
    /// Main website URL of the investor
    pub investor_website: String,
    /// Every portfolio company listed on the site, in the order they appear
    pub portfolio_companies: Vec<PortfolioCompany>,
    /// Industries or sectors the investor targets (e.g. "Healthcare", "Software")
    pub target_industry: Vec<String>,
    /// Typical equity ticket size range, as stated by the investor (e.g. "EUR 10-50m")
    pub ticket_size: String,
    /// Targeted enterprise value range of investments (e.g. "EUR 20-150m")
    #[serde(rename = "target_EV")]
    pub target_ev: String,
}

/// One holding listed in an investor's portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PortfolioCompany {
    /// Name of the portfolio company
    pub company_name: String,
    /// Website URL of the portfolio company; empty if not linked
    pub company_website: String,
    /// Holding status such as "Current" or "Exited"
    pub holding_status: String,
    /// Date of the investment or exit transaction, in whatever format the site uses; empty if unknown
    pub transaction_date: String,
}

/// Normalized reading of the free-text `holding_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoldingStatus {
    Current,
    Exited,
    Other(String),
}

impl HoldingStatus {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "current" | "active" | "held" | "portfolio" => HoldingStatus::Current,
            "exited" | "exit" | "realized" | "realised" | "divested" | "sold" | "former" => {
                HoldingStatus::Exited
            }
            _ => HoldingStatus::Other(raw.trim().to_string()),
        }
    }
}

impl PortfolioCompany {
    pub fn status(&self) -> HoldingStatus {
        HoldingStatus::parse(&self.holding_status)
    }
}

impl Investor {
    pub fn current_holdings(&self) -> impl Iterator<Item = &PortfolioCompany> {
        self.portfolio_companies
            .iter()
            .filter(|company| company.status() == HoldingStatus::Current)
    }

    pub fn exited_holdings(&self) -> impl Iterator<Item = &PortfolioCompany> {
        self.portfolio_companies
            .iter()
            .filter(|company| company.status() == HoldingStatus::Exited)
    }
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() {
        "-"
    } else {
        value
    }
}

impl fmt::Display for Investor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Investor: {}", or_dash(&self.investor_name))?;
        writeln!(f, "Website: {}", or_dash(&self.investor_website))?;
        writeln!(f, "Description: {}", or_dash(&self.investor_description))?;
        writeln!(f, "Target industries: {}", or_dash(&self.target_industry.join(", ")))?;
        writeln!(f, "Ticket size: {}", or_dash(&self.ticket_size))?;
        writeln!(f, "Target EV: {}", or_dash(&self.target_ev))?;
        write!(
            f,
            "Portfolio companies ({}, {} current, {} exited):",
            self.portfolio_companies.len(),
            self.current_holdings().count(),
            self.exited_holdings().count()
        )?;
        for company in &self.portfolio_companies {
            write!(f, "\n  - {company}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PortfolioCompany {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} <{}> [{}] {}",
            or_dash(&self.company_name),
            or_dash(&self.company_website),
            or_dash(&self.holding_status),
            or_dash(&self.transaction_date)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::CompletionSchema;

    fn company(name: &str, status: &str) -> PortfolioCompany {
        PortfolioCompany {
            company_name: name.to_string(),
            company_website: String::new(),
            holding_status: status.to_string(),
            transaction_date: String::new(),
        }
    }

    #[test]
    fn parses_holding_status_variants() {
        assert_eq!(HoldingStatus::parse(" Current "), HoldingStatus::Current);
        assert_eq!(HoldingStatus::parse("REALIZED"), HoldingStatus::Exited);
        assert_eq!(
            HoldingStatus::parse("Partial exit"),
            HoldingStatus::Other("Partial exit".to_string())
        );
    }

    #[test]
    fn schema_requires_every_field_and_uses_wire_names() {
        let handle = Investor::schema();
        assert_eq!(handle.schema_name(), "Investor");

        let mut required = handle.required_fields();
        required.sort_unstable();
        assert_eq!(
            required,
            vec![
                "investor_description",
                "investor_name",
                "investor_website",
                "portfolio_companies",
                "target_EV",
                "target_industry",
                "ticket_size",
            ]
        );

        let properties = &handle.schema_json()["properties"];
        assert!(properties.get("target_ev").is_none());
        assert!(properties["target_EV"]["description"]
            .as_str()
            .unwrap()
            .contains("enterprise value"));
        assert_eq!(
            properties["portfolio_companies"]["items"]["required"]
                .as_array()
                .unwrap()
                .len(),
            4
        );
    }

    #[test]
    fn display_lists_companies_and_counts() {
        let investor = Investor {
            investor_name: "Emeram".to_string(),
            investor_description: String::new(),
            investor_website: "https://www.emeram.com".to_string(),
            portfolio_companies: vec![company("Pflegia", "Current"), company("Jobware", "Exited")],
            target_industry: vec!["Healthcare".to_string(), "Software".to_string()],
            ticket_size: String::new(),
            target_ev: String::new(),
        };

        let rendered = investor.to_string();
        assert!(rendered.contains("Investor: Emeram"));
        assert!(rendered.contains("Description: -"));
        assert!(rendered.contains("Target industries: Healthcare, Software"));
        assert!(rendered.contains("(2, 1 current, 1 exited)"));
        assert!(rendered.contains("  - Jobware <-> [Exited] -"));
    }
}

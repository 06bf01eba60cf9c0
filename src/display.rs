//! Table and JSON rendering of lookup results and store statistics

use crate::api::{LookupRoute, Pagination, RouteState};
use crate::store::{RoutesStoreStats, SourceStats};
use crate::utils::{join_list, truncate_name, OutputFormat, DEFAULT_TEXT_MAX_LEN};
use anyhow::Result;
use chrono_humanize::HumanTime;
use serde::Serialize;
use std::time::Duration;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Table row of a lookup result
#[derive(Debug, Clone, Tabled)]
pub struct RouteRow {
    pub network: String,
    pub state: RouteState,
    pub source: String,
    pub neighbor: String,
    pub next_hop: String,
    pub as_path: String,
    pub communities: String,
    pub age: String,
}

impl From<&LookupRoute> for RouteRow {
    fn from(route: &LookupRoute) -> Self {
        let bgp = &route.route.bgp;
        let mut communities: Vec<String> = bgp.communities.iter().map(|c| c.to_string()).collect();
        communities.extend(bgp.large_communities.iter().map(|c| c.to_string()));

        RouteRow {
            network: route.network(),
            state: route.state,
            source: truncate_name(&route.source_name, DEFAULT_TEXT_MAX_LEN),
            neighbor: route.route.neighbor_id.clone(),
            next_hop: bgp.next_hop.to_string(),
            as_path: join_list(&bgp.as_path),
            communities: truncate_name(&communities.join(" "), DEFAULT_TEXT_MAX_LEN),
            age: humantime::format_duration(Duration::from_secs(route.route.age)).to_string(),
        }
    }
}

/// Table row of a source's statistics
#[derive(Debug, Clone, Tabled)]
pub struct SourceRow {
    pub id: String,
    pub name: String,
    pub status: String,
    pub imported: usize,
    pub filtered: usize,
    pub last_refresh: String,
    pub errors: u32,
}

impl From<&SourceStats> for SourceRow {
    fn from(stats: &SourceStats) -> Self {
        let last_refresh = match stats.state.last_refresh {
            Some(ts) => HumanTime::from(ts).to_string(),
            None => "never".to_string(),
        };
        SourceRow {
            id: stats.id.clone(),
            name: truncate_name(&stats.name, DEFAULT_TEXT_MAX_LEN),
            status: stats.state.status.to_string(),
            imported: stats.routes.imported,
            filtered: stats.routes.filtered,
            last_refresh,
            errors: stats.state.error_count,
        }
    }
}

fn table<T: Tabled>(rows: Vec<T>, format: OutputFormat) -> String {
    let mut table = Table::new(rows);
    match format {
        OutputFormat::Markdown => table.with(Style::markdown()),
        _ => table.with(Style::rounded()),
    };
    table.to_string()
}

fn json<T: Serialize>(items: &[T], format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::JsonLine => items
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?
            .join("\n"),
        OutputFormat::JsonPretty => serde_json::to_string_pretty(items)?,
        _ => serde_json::to_string(items)?,
    })
}

/// Render one page of lookup results
pub fn render_routes(
    routes: &[LookupRoute],
    pagination: &Pagination,
    format: OutputFormat,
) -> Result<String> {
    if format.is_json() {
        return json(routes, format);
    }

    let rows: Vec<RouteRow> = routes.iter().map(RouteRow::from).collect();
    Ok(format!(
        "{}\npage {} of {} ({} routes)",
        table(rows, format),
        pagination.page + 1,
        pagination.total_pages.max(1),
        pagination.total_results
    ))
}

/// Render the statistics of all sources
pub fn render_stats(stats: &RoutesStoreStats, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json | OutputFormat::JsonLine => Ok(serde_json::to_string(stats)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(stats)?),
        _ => {
            let rows: Vec<SourceRow> = stats.sources.iter().map(SourceRow::from).collect();
            Ok(format!(
                "{}\ntotal: {} imported, {} filtered; interned AS paths: {}, communities: {}",
                table(rows, format),
                stats.total_routes.imported,
                stats.total_routes.filtered,
                stats.pools.as_paths,
                stats.pools.communities
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{paginate, BgpInfo, Community, Route, RoutesCount};
    use crate::pools::PoolStats;
    use crate::store::SourceState;
    use std::sync::Arc;

    fn lookup_route() -> LookupRoute {
        LookupRoute {
            route: Route {
                id: "r1".to_string(),
                network: "193.200.230.0/24".parse().unwrap(),
                neighbor_id: "ID163_AS31078".to_string(),
                gateway: "172.31.194.22".parse().unwrap(),
                interface: "eth1".to_string(),
                metric: 100,
                age: 3660,
                primary: true,
                bgp: BgpInfo {
                    as_path: Arc::from(vec![31078, 8447]),
                    next_hop: "172.31.194.22".parse().unwrap(),
                    communities: Arc::from(vec![Community(0, 6695)]),
                    ..Default::default()
                },
            },
            state: RouteState::Imported,
            source_id: "rs1".to_string(),
            source_name: "Route Server 1".to_string(),
        }
    }

    #[test]
    fn test_route_row() {
        let row = RouteRow::from(&lookup_route());
        assert_eq!(row.network, "193.200.230.0/24");
        assert_eq!(row.as_path, "31078 8447");
        assert_eq!(row.communities, "0:6695");
        assert_eq!(row.next_hop, "172.31.194.22");
        assert_eq!(row.age, "1h 1m");
    }

    #[test]
    fn test_render_routes() {
        let routes = vec![lookup_route()];
        let (page, pagination) = paginate(&routes, 0, 10);

        let text = render_routes(&page, &pagination, OutputFormat::Table).unwrap();
        assert!(text.contains("193.200.230.0/24"));
        assert!(text.contains("page 1 of 1 (1 routes)"));

        let lines = render_routes(&page, &pagination, OutputFormat::JsonLine).unwrap();
        let value: serde_json::Value = serde_json::from_str(&lines).unwrap();
        assert_eq!(value["network"], "193.200.230.0/24");
        assert_eq!(value["state"], "imported");
        assert_eq!(value["source_id"], "rs1");
    }

    #[test]
    fn test_render_stats() {
        let stats = RoutesStoreStats {
            sources: vec![SourceStats {
                id: "rs1".to_string(),
                name: "Route Server 1".to_string(),
                routes: RoutesCount {
                    imported: 8,
                    filtered: 1,
                },
                state: SourceState::default(),
            }],
            total_routes: RoutesCount {
                imported: 8,
                filtered: 1,
            },
            pools: PoolStats::default(),
        };

        let text = render_stats(&stats, OutputFormat::Markdown).unwrap();
        assert!(text.contains("| rs1"));
        assert!(text.contains("never"));
        assert!(text.contains("total: 8 imported, 1 filtered"));

        let value: serde_json::Value =
            serde_json::from_str(&render_stats(&stats, OutputFormat::Json).unwrap()).unwrap();
        assert_eq!(value["total_routes"]["imported"], 8);
        assert_eq!(value["sources"][0]["state"]["status"], "idle");
    }
}

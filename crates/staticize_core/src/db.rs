use anyhow::{Context, Result, anyhow};
use mysql::prelude::{FromValue, Queryable};
use mysql::{Conn, OptsBuilder, Row};

use crate::config::DatabaseSection;
use crate::node::RawNode;

/// Published nodes with their URL alias (if any) and resolved author name,
/// newest creation time first. The left join keeps nodes that never got a
/// friendly alias.
pub const GET_NODES_SQL: &str = r#"
SELECT
    node.created,
    url_alias.dst,
    node.nid,
    node.title,
    node.type,
    node_revisions.body,
    node_revisions.teaser,
    users.name AS username
FROM
    node
    LEFT JOIN url_alias ON url_alias.src = CONCAT('node/', node.nid)
    JOIN node_revisions ON node.nid = node_revisions.nid
    JOIN users ON node.uid = users.uid
WHERE
    node.status = 1
ORDER BY created DESC
"#;

pub const GET_NODE_TAGS_SQL: &str = r#"
SELECT
    term_data.name
FROM
    term_node
    JOIN term_data ON term_node.tid = term_data.tid
WHERE
    term_node.nid = ?
"#;

/// Read-only access to the legacy content database. The transform pipeline
/// only sees this trait, so tests drive it with an in-memory source.
pub trait NodeSource {
    /// All published nodes, ordered newest creation time first.
    fn fetch_nodes(&mut self) -> Result<Vec<RawNode>>;
    /// Tag names attached to one node.
    fn fetch_tags(&mut self, nid: u64) -> Result<Vec<String>>;
}

/// `NodeSource` backed by a live MySQL connection. One connection per run,
/// opened once and kept open for the duration of the transform step.
pub struct MysqlSource {
    conn: Conn,
}

impl MysqlSource {
    pub fn connect(database: &DatabaseSection) -> Result<Self> {
        let opts = OptsBuilder::new()
            .ip_or_hostname(Some(database.host()))
            .user(Some(database.user()))
            .pass(Some(database.password()))
            .db_name(Some(database.database()));
        let conn = Conn::new(opts).with_context(|| {
            format!(
                "failed to connect to database `{}` on {}",
                database.database(),
                database.host()
            )
        })?;
        Ok(Self { conn })
    }
}

impl NodeSource for MysqlSource {
    fn fetch_nodes(&mut self) -> Result<Vec<RawNode>> {
        let rows: Vec<Row> = self
            .conn
            .query(GET_NODES_SQL)
            .context("node query failed")?;
        rows.into_iter().map(row_to_node).collect()
    }

    fn fetch_tags(&mut self, nid: u64) -> Result<Vec<String>> {
        let names: Vec<Vec<u8>> = self
            .conn
            .exec(GET_NODE_TAGS_SQL, (nid,))
            .with_context(|| format!("tag query failed for node {nid}"))?;
        // Tag names go straight into front matter; a malformed byte must not
        // abort the run the way a malformed node row would.
        Ok(names
            .into_iter()
            .map(|name| String::from_utf8_lossy(&name).into_owned())
            .collect())
    }
}

fn row_to_node(mut row: Row) -> Result<RawNode> {
    Ok(RawNode {
        created: column(&mut row, "created")?,
        alias: column::<Option<Vec<u8>>>(&mut row, "dst")?,
        nid: column(&mut row, "nid")?,
        title: column(&mut row, "title")?,
        node_type: column(&mut row, "type")?,
        body: column(&mut row, "body")?,
        teaser: column(&mut row, "teaser")?,
        author: column(&mut row, "username")?,
    })
}

fn column<T: FromValue>(row: &mut Row, name: &str) -> Result<T> {
    row.take_opt(name)
        .ok_or_else(|| anyhow!("node query returned no `{name}` column"))?
        .map_err(|err| anyhow!("bad `{name}` value in node row: {err:?}"))
}

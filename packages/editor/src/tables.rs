//! # Table Structure
//!
//! Row and column insertion and deletion around the active cell.
//!
//! New cells copy the border of the cell they are created next to. Removing
//! the last row or column removes the table; an empty paragraph takes its
//! place and receives the caret.

use crate::commands::TableOp;
use crate::errors::{EditorError, EditorResult};
use crate::selection::DomPoint;
use berry_dom::{Dom, NodeId};
use berry_sanitizer::style_guards::CELL_BORDER;
use berry_sanitizer::styles::style_property;

const CELL_TAGS: &[&str] = &["td", "th"];

/// The table around the active cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellContext {
    pub table: NodeId,
    pub row: NodeId,
    pub cell: NodeId,
    /// Index of the cell among its row's cells
    pub column: usize,
}

impl CellContext {
    pub fn locate(dom: &Dom, node: NodeId) -> Option<Self> {
        let cell = dom.closest(node, CELL_TAGS)?;
        let row = dom.parent(cell).filter(|r| dom.is_element(*r, &["tr"]))?;
        let table = dom.closest(row, &["table"])?;
        let column = cells(dom, row).iter().position(|c| *c == cell)?;
        Some(Self {
            table,
            row,
            cell,
            column,
        })
    }
}

fn cells(dom: &Dom, row: NodeId) -> Vec<NodeId> {
    dom.children(row)
        .iter()
        .copied()
        .filter(|c| dom.is_element(*c, CELL_TAGS))
        .collect()
}

/// Rows belonging to `table` itself (not to nested tables)
fn rows(dom: &Dom, table: NodeId) -> Vec<NodeId> {
    dom.descendants(table)
        .into_iter()
        .filter(|n| dom.is_element(*n, &["tr"]) && dom.closest(*n, &["table"]) == Some(table))
        .collect()
}

/// A new empty cell shaped like `reference`
fn cell_like(dom: &mut Dom, reference: NodeId) -> NodeId {
    let tag = dom.tag_name(reference).unwrap_or("td").to_string();
    let bordered = dom
        .attr(reference, "style")
        .and_then(|s| style_property(s, "border"))
        .is_some();
    if bordered {
        let border = format!("border: {CELL_BORDER}");
        dom.create_element_with_attrs(&tag, &[("style", border.as_str())])
    } else {
        dom.create_element(&tag)
    }
}

/// Replace the table with an empty paragraph and return the caret inside it
fn remove_table(dom: &mut Dom, table: NodeId) -> EditorResult<DomPoint> {
    let paragraph = dom.create_element("p");
    dom.replace(table, paragraph)?;
    Ok(DomPoint::new(paragraph, 0))
}

/// Apply a structure change. Returns where the caret should go.
pub fn apply(dom: &mut Dom, ctx: CellContext, op: TableOp) -> EditorResult<DomPoint> {
    match op {
        TableOp::AddRowBefore | TableOp::AddRowAfter => {
            let row = dom.create_element("tr");
            for reference in cells(dom, ctx.row) {
                let cell = cell_like(dom, reference);
                dom.append_child(row, cell)?;
            }
            if op == TableOp::AddRowBefore {
                dom.insert_before(ctx.row, row)?;
            } else {
                dom.insert_after(ctx.row, row)?;
            }
            let first = cells(dom, row).get(ctx.column).copied().unwrap_or(row);
            Ok(DomPoint::new(first, 0))
        }

        TableOp::AddColumnBefore | TableOp::AddColumnAfter => {
            let mut caret = None;
            for row in rows(dom, ctx.table) {
                let row_cells = cells(dom, row);
                let Some(reference) = row_cells.get(ctx.column.min(row_cells.len().saturating_sub(1))).copied() else {
                    continue;
                };
                let cell = cell_like(dom, reference);
                if op == TableOp::AddColumnBefore {
                    dom.insert_before(reference, cell)?;
                } else {
                    dom.insert_after(reference, cell)?;
                }
                if row == ctx.row {
                    caret = Some(cell);
                }
            }
            let cell = caret.ok_or(EditorError::NotInTable)?;
            Ok(DomPoint::new(cell, 0))
        }

        TableOp::DeleteRow => {
            let all_rows = rows(dom, ctx.table);
            if all_rows.len() <= 1 {
                return remove_table(dom, ctx.table);
            }
            let index = all_rows.iter().position(|r| *r == ctx.row).unwrap_or(0);
            let neighbour = all_rows
                .get(index + 1)
                .or_else(|| index.checked_sub(1).and_then(|i| all_rows.get(i)))
                .copied()
                .ok_or(EditorError::NotInTable)?;

            let parent = dom.parent(ctx.row);
            dom.detach(ctx.row);
            // Drop a section left without rows.
            if let Some(section) = parent.filter(|p| dom.is_element(*p, &["thead", "tbody"])) {
                if dom.children(section).is_empty() {
                    dom.detach(section);
                }
            }

            let neighbour_cells = cells(dom, neighbour);
            let target = neighbour_cells
                .get(ctx.column)
                .or(neighbour_cells.last())
                .copied()
                .unwrap_or(neighbour);
            Ok(DomPoint::new(target, 0))
        }

        TableOp::DeleteColumn => {
            let mut remaining = 0;
            for row in rows(dom, ctx.table) {
                let row_cells = cells(dom, row);
                if let Some(cell) = row_cells.get(ctx.column) {
                    dom.detach(*cell);
                }
                if cells(dom, row).is_empty() {
                    dom.detach(row);
                } else {
                    remaining += 1;
                }
            }
            if remaining == 0 {
                return remove_table(dom, ctx.table);
            }

            let row_cells = cells(dom, ctx.row);
            let target = row_cells
                .get(ctx.column)
                .or(row_cells.last())
                .copied()
                .unwrap_or(ctx.row);
            Ok(DomPoint::new(target, 0))
        }

        TableOp::Delete => remove_table(dom, ctx.table),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BORDERED: &str = "<table style=\"border-collapse: collapse\"><tbody>\
        <tr><td style=\"border: 1px solid #000000\">a</td><td style=\"border: 1px solid #000000\">b</td></tr>\
        <tr><td style=\"border: 1px solid #000000\">c</td><td style=\"border: 1px solid #000000\">d</td></tr>\
        </tbody></table>";

    fn context(dom: &Dom, text: &str) -> CellContext {
        let node = dom
            .text_nodes(dom.root())
            .into_iter()
            .find(|n| dom.text(*n) == Some(text))
            .unwrap();
        CellContext::locate(dom, node).unwrap()
    }

    #[test]
    fn test_locate_cell() {
        let dom = Dom::parse(BORDERED);
        let ctx = context(&dom, "d");
        assert_eq!(ctx.column, 1);
        assert!(dom.is_element(ctx.table, &["table"]));
    }

    #[test]
    fn test_add_row_copies_border() {
        let mut dom = Dom::parse(BORDERED);
        let ctx = context(&dom, "a");
        apply(&mut dom, ctx, TableOp::AddRowAfter).unwrap();
        let table = ctx.table;
        assert_eq!(rows(&dom, table).len(), 3);
        let new_row = rows(&dom, table)[1];
        for cell in cells(&dom, new_row) {
            assert_eq!(dom.attr(cell, "style"), Some("border: 1px solid #000000"));
        }
    }

    #[test]
    fn test_add_column_before() {
        let mut dom = Dom::parse("<table><tbody><tr><td>a</td></tr><tr><td>b</td></tr></tbody></table>");
        let ctx = context(&dom, "a");
        apply(&mut dom, ctx, TableOp::AddColumnBefore).unwrap();
        assert_eq!(
            dom.to_html(),
            "<table><tbody><tr><td></td><td>a</td></tr><tr><td></td><td>b</td></tr></tbody></table>"
        );
    }

    #[test]
    fn test_delete_last_row_replaces_table() {
        let mut dom = Dom::parse("<p>x</p><table><tbody><tr><td>only</td></tr></tbody></table>");
        let ctx = context(&dom, "only");
        let caret = apply(&mut dom, ctx, TableOp::DeleteRow).unwrap();
        assert_eq!(dom.to_html(), "<p>x</p><p></p>");
        assert!(dom.is_element(caret.node, &["p"]));
        assert!(dom.is_connected(caret.node));
    }

    #[test]
    fn test_delete_column() {
        let mut dom = Dom::parse(BORDERED);
        let ctx = context(&dom, "b");
        apply(&mut dom, ctx, TableOp::DeleteColumn).unwrap();
        assert_eq!(dom.text_content(dom.root()), "ac");

        let ctx = context(&dom, "a");
        apply(&mut dom, ctx, TableOp::DeleteColumn).unwrap();
        assert_eq!(dom.to_html(), "<p></p>");
    }

    #[test]
    fn test_delete_row_moves_caret_to_neighbour() {
        let mut dom = Dom::parse(BORDERED);
        let ctx = context(&dom, "b");
        let caret = apply(&mut dom, ctx, TableOp::DeleteRow).unwrap();
        assert_eq!(dom.text_content(caret.node), "d");
    }
}

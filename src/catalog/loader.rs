//! Reads the catalog from the metadata tables.

use std::collections::HashMap;
use std::sync::Arc;

use rusqlite::types::FromSql;
use rusqlite::{Connection as SqliteConnection, Row};
use tracing::{debug, info, warn};

use super::workflow::{from_dotnet_ticks, parse_start_date};
use super::{Catalog, Column, Connection, EntityType, LastChange, Workflow, WorkflowMessage};
use crate::convert::{
    ConverterRegistry, CustomDataType, DistributionBox, DistributionLevel, DistributionMap,
    EnumElement, EnumType, SpecialType,
};
use crate::error::EdsResult;

/// Special value type names used by `DataTypesColumns.SpecialValueType`.
const SPECIAL_ENUM: &str = "Enum";
const SPECIAL_DISTRIBUTION: &str = "DataDistribution";

/// Optional column: `None` when the column is missing or null.
fn opt<T: FromSql>(row: &Row<'_>, name: &str) -> EdsResult<Option<T>> {
    match row.get::<_, Option<T>>(name) {
        Ok(value) => Ok(value),
        Err(rusqlite::Error::InvalidColumnName(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn table_exists(conn: &SqliteConnection, table: &str) -> EdsResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Visit every row of `table`. Missing optional tables are skipped.
fn each_row<F>(conn: &SqliteConnection, table: &str, required: bool, mut visit: F) -> EdsResult<()>
where
    F: FnMut(&Row<'_>) -> EdsResult<()>,
{
    if !required && !table_exists(conn, table)? {
        debug!(table, "metadata table not present");
        return Ok(());
    }
    let mut stmt = conn.prepare(&format!("SELECT * FROM \"{table}\""))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        visit(row)?;
    }
    Ok(())
}

/// Type references of a column row, resolved once everything is loaded.
struct ColumnRow {
    column: Column,
    owner: (i64, Option<i64>),
    custom_type: Option<i64>,
    special_name: Option<String>,
    special_id: Option<i64>,
}

fn read_column(row: &Row<'_>, connected: bool) -> EdsResult<ColumnRow> {
    let mut column = Column::new(row.get("ColumnID")?, &row.get::<_, String>("DBColumnName")?);
    column.display_name = opt(row, "Property_DisplayName")?;
    column.description = opt(row, "Property_Description")?;
    column.format_string = opt(row, "Property_FormatString")?;
    column.data_purpose = opt(row, "Property_SemanticDescription")?;
    column.guid = opt(row, "Property_Guid")?;
    column.value_type_guid = opt(row, "ValueType")?;
    column.default_value = opt(row, "DefaultValue")?;
    column.nullable = opt::<bool>(row, "Nullable")?.unwrap_or(true);
    column.visible_position = opt(row, "Grid_VisiblePosition")?;
    column.allow_edit = opt::<bool>(row, "Grid_AllowEdit")?.unwrap_or(false);
    column.last_change = LastChange::new(opt(row, "LastChange")?);

    let owner = if connected {
        (row.get("DataTypeID1")?, Some(row.get("DataTypeID2")?))
    } else {
        (row.get("DataTypeID")?, None)
    };

    Ok(ColumnRow {
        column,
        owner,
        custom_type: opt(row, "CustomDataType")?,
        special_name: opt(row, "SpecialValueType")?,
        special_id: opt(row, "SpecialValueTypeID")?,
    })
}

struct Loader<'a> {
    conn: &'a SqliteConnection,
    registry: &'a ConverterRegistry,
    custom_types: HashMap<i64, CustomDataType>,
    enums: HashMap<i64, Arc<EnumType>>,
    distribution_maps: HashMap<i64, Arc<DistributionMap>>,
}

pub(super) fn load(conn: &SqliteConnection, registry: &ConverterRegistry) -> EdsResult<Catalog> {
    let mut loader = Loader {
        conn,
        registry,
        custom_types: HashMap::new(),
        enums: HashMap::new(),
        distribution_maps: HashMap::new(),
    };

    loader.load_custom_types()?;
    loader.load_enums()?;
    loader.load_distribution_maps()?;
    let types = loader.load_types()?;
    let connections = loader.load_connections(&types)?;
    let workflows = loader.load_workflows()?;

    let catalog = Catalog::from_parts(types, connections)?
        .with_special_types(loader.custom_types, loader.enums, loader.distribution_maps)
        .with_workflows(workflows);

    info!(
        types = catalog.type_count(),
        connections = catalog.connections().count(),
        workflows = catalog.workflows().count(),
        "loaded catalog"
    );
    Ok(catalog)
}

impl Loader<'_> {
    fn load_custom_types(&mut self) -> EdsResult<()> {
        let mut found = HashMap::new();
        each_row(self.conn, "CustomDataTypes", true, |row| {
            let id: i64 = row.get("Value")?;
            let name: String = row.get("Name")?;
            let system_type: Option<String> = opt(row, "SystemType")?;
            found.insert(id, CustomDataType::new(id, &name, system_type.as_deref()));
            Ok(())
        })?;
        self.custom_types = found;
        Ok(())
    }

    fn load_enums(&mut self) -> EdsResult<()> {
        let mut enums: HashMap<i64, EnumType> = HashMap::new();
        each_row(self.conn, "EnumDataTypes", false, |row| {
            let id: i64 = row.get("EnumID")?;
            let type_name: String = row.get("EnumType")?;
            let is_flags = opt::<bool>(row, "IsFlagsEnum")?.unwrap_or(false);
            enums.insert(id, EnumType::new(id, &type_name, is_flags));
            Ok(())
        })?;

        each_row(self.conn, "EnumDataTypeValues", false, |row| {
            let enum_id: i64 = row.get("EnumID")?;
            let element = EnumElement {
                value: row.get("Value")?,
                display_name: opt(row, "DisplayName")?.unwrap_or_default(),
                abbreviation: opt(row, "Abbreviation")?,
            };
            match enums.get_mut(&enum_id) {
                Some(ty) => ty.add_element(element),
                None => warn!(enum_id, "enum value references unknown enum type"),
            }
            Ok(())
        })?;

        self.enums = enums.into_iter().map(|(id, ty)| (id, Arc::new(ty))).collect();
        Ok(())
    }

    fn load_distribution_maps(&mut self) -> EdsResult<()> {
        let mut maps: HashMap<i64, DistributionMap> = HashMap::new();
        let mut boxes: HashMap<i64, Vec<DistributionBox>> = HashMap::new();
        let mut levels: HashMap<i64, Vec<DistributionLevel>> = HashMap::new();
        let mut extended: HashMap<i64, HashMap<String, String>> = HashMap::new();

        each_row(self.conn, "DataDistributionMaps", false, |row| {
            let id: i64 = row.get("ID")?;
            let name: String = row.get("Name")?;
            let type_id: Option<i64> = opt(row, "CustomDataType")?;
            let data_type = match type_id.and_then(|t| self.custom_types.get(&t)) {
                Some(data_type) => data_type.clone(),
                None => {
                    warn!(map = %name, ?type_id, "distribution map has unknown custom data type");
                    CustomDataType::new(type_id.unwrap_or_default(), "Unknown", None)
                }
            };
            let mut map = DistributionMap::new(id, &name, data_type);
            map.description = opt(row, "Description")?;
            map.semantic_terms = opt(row, "SemanticTerms")?;
            map.minimum_value = opt(row, "MinimumValue")?;
            map.maximum_value = opt(row, "MaximumValue")?;
            maps.insert(id, map);
            Ok(())
        })?;

        each_row(self.conn, "DataDistributionBoxExtendedData", false, |row| {
            let box_id: i64 = row.get("BoxID")?;
            let name: String = row.get("Name")?;
            let value: Option<String> = opt(row, "ValueString")?;
            extended
                .entry(box_id)
                .or_default()
                .insert(name, value.unwrap_or_default());
            Ok(())
        })?;

        each_row(self.conn, "DataDistributionBoxes", false, |row| {
            let id: i64 = row.get("BoxID")?;
            let map_id: i64 = row.get("DataDistributionMapID")?;
            boxes.entry(map_id).or_default().push(DistributionBox {
                id,
                name: opt(row, "Name")?.unwrap_or_default(),
                position: row.get("Position")?,
                description: opt(row, "Description")?,
                semantic_terms: opt(row, "SemanticTerms")?,
                color: opt(row, "Color")?,
                is_first_in_group: opt::<bool>(row, "IsFirstInGroup")?.unwrap_or(false),
                extended_data: extended.remove(&id).unwrap_or_default(),
            });
            Ok(())
        })?;

        each_row(self.conn, "DataDistributionLevels", false, |row| {
            let map_id: i64 = row.get("DataDistributionMapID")?;
            levels.entry(map_id).or_default().push(DistributionLevel {
                id: row.get("LevelID")?,
                name: opt(row, "Name")?.unwrap_or_default(),
                position: row.get("Position")?,
                description: opt(row, "Description")?,
                semantic_terms: opt(row, "SemanticTerms")?,
                color: opt(row, "Color")?,
                threshold: opt(row, "Threshold")?.unwrap_or(f64::INFINITY),
            });
            Ok(())
        })?;

        self.distribution_maps = maps
            .into_iter()
            .map(|(id, mut map)| {
                map.set_boxes(boxes.remove(&id).unwrap_or_default());
                map.set_levels(levels.remove(&id).unwrap_or_default());
                (id, Arc::new(map))
            })
            .collect();
        Ok(())
    }

    fn load_workflows(&self) -> EdsResult<Vec<Workflow>> {
        let mut workflows = Vec::new();
        each_row(self.conn, "Workflows", false, |row| {
            let id: i64 = row.get("WorkflowID")?;
            let start_date = match opt::<String>(row, "WorkflowStartDate")? {
                Some(text) => {
                    let date = parse_start_date(&text);
                    if date.is_none() {
                        warn!(workflow = id, date = %text, "unreadable workflow start date");
                    }
                    date
                }
                None => None,
            };
            workflows.push(Workflow {
                id,
                guid: opt(row, "WorkflowGUID")?,
                name: opt(row, "WorkflowName")?,
                description: opt(row, "WorkflowDescription")?,
                workflow_type: opt(row, "WorkflowType")?,
                level: opt(row, "Level")?,
                version: opt(row, "Version")?,
                start_date,
                state: opt(row, "WorkflowState")?,
                study: opt(row, "Study")?,
                user: opt(row, "User")?,
                software: opt(row, "SoftwareVersion")?,
                machine: opt(row, "MachineName")?,
                xml: opt(row, "WorkflowXML")?,
                messages: Vec::new(),
            });
            Ok(())
        })?;
        workflows.sort_by_key(|w| w.id);

        each_row(self.conn, "WorkflowMessages", false, |row| {
            let message = WorkflowMessage {
                id: row.get("MessageID")?,
                workflow_id: row.get("WorkflowID")?,
                level: opt(row, "Level")?,
                node_name: opt(row, "ProcessingNodeName")?,
                time: opt::<i64>(row, "Time")?.and_then(from_dotnet_ticks),
                kind: opt(row, "MessageKind")?,
                message: opt(row, "Message")?,
            };
            match workflows.iter_mut().find(|w| w.id == message.workflow_id) {
                Some(workflow) => workflow.messages.push(message),
                None => debug!(
                    workflow = message.workflow_id,
                    "message of unknown workflow skipped"
                ),
            }
            Ok(())
        })?;

        Ok(workflows)
    }

    /// Attach type references and converters, and mark ID columns.
    fn finish_column(
        &self,
        row: ColumnRow,
        ranks: &HashMap<i64, i64>,
        extended: &mut HashMap<i64, HashMap<String, String>>,
    ) -> Column {
        let ColumnRow {
            mut column,
            custom_type,
            special_name,
            special_id,
            ..
        } = row;

        column.id_order = ranks.get(&column.id).copied();
        column.extended_data = extended.remove(&column.id).unwrap_or_default();

        if let Some(type_id) = custom_type {
            column.data_type = self.custom_types.get(&type_id).cloned();
            if column.data_type.is_none() {
                warn!(column = %column.column_name, type_id, "unknown custom data type");
            }
        }

        column.special = match (special_name.as_deref(), special_id) {
            (Some(SPECIAL_ENUM), Some(id)) => self.enums.get(&id).cloned().map(SpecialType::Enum),
            (Some(SPECIAL_DISTRIBUTION), Some(id)) => self
                .distribution_maps
                .get(&id)
                .cloned()
                .map(SpecialType::Distribution),
            _ => None,
        };
        if column.special.is_none() && special_id.is_some() && special_name.is_some() {
            warn!(
                column = %column.column_name,
                special = ?special_name,
                ?special_id,
                "unknown special value type"
            );
        }

        column.converter = column
            .value_type_guid
            .as_deref()
            .and_then(|guid| self.registry.get(guid))
            .or_else(|| {
                column
                    .data_purpose
                    .as_deref()
                    .and_then(|purpose| self.registry.get(purpose))
            });

        column
    }

    fn load_ranks(&self, table: &str) -> EdsResult<HashMap<i64, i64>> {
        let mut ranks: HashMap<i64, i64> = HashMap::new();
        each_row(self.conn, table, false, |row| {
            ranks.insert(row.get("ColumnID")?, row.get("Rank")?);
            Ok(())
        })?;
        Ok(ranks)
    }

    fn load_types(&self) -> EdsResult<Vec<EntityType>> {
        let mut types = Vec::new();
        each_row(self.conn, "DataTypes", true, |row| {
            let mut ty = EntityType::new(
                row.get("DataTypeID")?,
                &row.get::<_, String>("Name")?,
                &row.get::<_, String>("TableName")?,
            );
            ty.display_name = opt(row, "DisplayName")?;
            ty.description = opt(row, "Description")?;
            types.push(ty);
            Ok(())
        })?;

        let ranks = self.load_ranks("DataTypesIDColumns")?;

        let mut extended: HashMap<i64, HashMap<String, String>> = HashMap::new();
        each_row(self.conn, "DataTypesColumnExtendedData", false, |row| {
            let column_id: i64 = row.get("ColumnID")?;
            let name: String = row.get("Name")?;
            let value: Option<String> = opt(row, "ValueString")?;
            extended
                .entry(column_id)
                .or_default()
                .insert(name, value.unwrap_or_default());
            Ok(())
        })?;

        let mut rows = Vec::new();
        each_row(self.conn, "DataTypesColumns", true, |row| {
            rows.push(read_column(row, false)?);
            Ok(())
        })?;

        let index: HashMap<i64, usize> = types.iter().enumerate().map(|(i, t)| (t.id, i)).collect();
        for row in rows {
            let owner = row.owner.0;
            let column = self.finish_column(row, &ranks, &mut extended);
            match index.get(&owner) {
                Some(&i) => types[i].columns.push(column),
                None => warn!(data_type = owner, column = %column.column_name, "column of unknown data type"),
            }
        }

        Ok(types)
    }

    fn load_connections(&self, types: &[EntityType]) -> EdsResult<Vec<Connection>> {
        let by_id: HashMap<i64, &EntityType> = types.iter().map(|t| (t.id, t)).collect();

        let mut connections: Vec<Connection> = Vec::new();
        let mut index: HashMap<(i64, i64), usize> = HashMap::new();
        each_row(self.conn, "ConnectedDataTypes", false, |row| {
            let id1: i64 = row.get("DataTypeID1")?;
            let id2: i64 = row.get("DataTypeID2")?;
            let table: String = row.get("ConnectedTableName")?;
            match (by_id.get(&id1), by_id.get(&id2)) {
                (Some(t1), Some(t2)) => {
                    let conn = Connection::new(t1, t2, &table);
                    index.insert(conn.key(), connections.len());
                    connections.push(conn);
                }
                _ => warn!(id1, id2, table = %table, "connection references unknown data type"),
            }
            Ok(())
        })?;

        let ranks = self.load_ranks("ConnectedDataTypesIDColumns")?;
        let mut rows = Vec::new();
        each_row(self.conn, "ConnectedDataTypesColumns", false, |row| {
            rows.push(read_column(row, true)?);
            Ok(())
        })?;

        let mut no_extended = HashMap::new();
        for row in rows {
            let key = super::types::connection_key(row.owner.0, row.owner.1.unwrap_or_default());
            let column = self.finish_column(row, &ranks, &mut no_extended);
            match index.get(&key) {
                Some(&i) => connections[i].columns.push(column),
                None => warn!(?key, column = %column.column_name, "column of unknown connection"),
            }
        }

        Ok(connections)
    }
}

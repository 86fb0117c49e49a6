//! A small result file shared by the integration tests.
//!
//! Types: `Compound` (table `Compounds`), `Peak` (`Peaks`), `Spectrum`
//! (`Spectra`) and `Sample` (`Samples`, unconnected). Connections:
//! Compound-Peak through `CompoundsPeaks` (carries `Score` and a colliding
//! `Area`), Peak-Spectrum through `PeaksSpectra`. `Compounds.Comment` is
//! stored in the view file. Two workflows, `Processing` with two messages
//! and `Consensus` with none.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use eds::config::Settings;
use eds::convert::ConverterRegistry;
use eds::Eds;
use rusqlite::Connection;
use tempfile::TempDir;

const METADATA: &str = r#"
CREATE TABLE CustomDataTypes (Value INTEGER PRIMARY KEY, Name TEXT NOT NULL, SystemType TEXT);
INSERT INTO CustomDataTypes VALUES
    (1, 'Int', 'System.Int32'),
    (2, 'Double', 'System.Double'),
    (3, 'String', 'System.String'),
    (4, 'Boolean', 'System.Boolean'),
    (5, 'Binary', 'System.Byte[]');

CREATE TABLE EnumDataTypes (EnumID INTEGER PRIMARY KEY, EnumType TEXT NOT NULL, IsFlagsEnum INTEGER);
INSERT INTO EnumDataTypes VALUES (1, 'Polarity', 0);

CREATE TABLE EnumDataTypeValues (EnumID INTEGER, Value INTEGER, DisplayName TEXT, Abbreviation TEXT);
INSERT INTO EnumDataTypeValues VALUES (1, 1, 'Positive', '+'), (1, 2, 'Negative', '-');

CREATE TABLE DataDistributionMaps (ID INTEGER PRIMARY KEY, Name TEXT NOT NULL, CustomDataType INTEGER,
    Description TEXT, SemanticTerms TEXT, MinimumValue REAL, MaximumValue REAL);
INSERT INTO DataDistributionMaps (ID, Name, CustomDataType) VALUES (1, 'Tags', 4);

CREATE TABLE DataDistributionBoxes (BoxID INTEGER PRIMARY KEY, DataDistributionMapID INTEGER, Name TEXT,
    Position INTEGER, Description TEXT, SemanticTerms TEXT, Color TEXT, IsFirstInGroup INTEGER);
INSERT INTO DataDistributionBoxes (BoxID, DataDistributionMapID, Name, Position) VALUES
    (1, 1, 'Red', 0), (2, 1, 'Green', 1), (3, 1, 'Blue', 2);

CREATE TABLE DataTypes (DataTypeID INTEGER PRIMARY KEY, Name TEXT NOT NULL, TableName TEXT NOT NULL,
    DisplayName TEXT, Description TEXT);
INSERT INTO DataTypes VALUES
    (1, 'Compound', 'Compounds', 'Compounds', NULL),
    (2, 'Peak', 'Peaks', 'Peaks', NULL),
    (3, 'Spectrum', 'Spectra', 'Spectra', NULL),
    (4, 'Sample', 'Samples', 'Samples', NULL);

CREATE TABLE DataTypesColumns (ColumnID INTEGER PRIMARY KEY, DataTypeID INTEGER, DBColumnName TEXT NOT NULL,
    Property_DisplayName TEXT, Property_SemanticDescription TEXT, CustomDataType INTEGER,
    SpecialValueType TEXT, SpecialValueTypeID INTEGER, Nullable INTEGER, Grid_VisiblePosition INTEGER,
    Grid_AllowEdit INTEGER, LastChange TEXT);
INSERT INTO DataTypesColumns (ColumnID, DataTypeID, DBColumnName, Property_DisplayName,
    Property_SemanticDescription, CustomDataType, SpecialValueType, SpecialValueTypeID, Nullable,
    Grid_VisiblePosition, Grid_AllowEdit) VALUES
    (1, 1, 'ID', 'ID', NULL, 1, NULL, NULL, 0, 1, 0),
    (2, 1, 'Name', 'Name', NULL, 3, NULL, NULL, 1, 2, 1),
    (3, 1, 'MolecularWeight', 'Calc. MW', 'MolecularWeight', 2, NULL, NULL, 1, 3, 0),
    (4, 1, 'Polarity', 'Polarity', NULL, 1, 'Enum', 1, 1, 4, 1),
    (5, 1, 'Checked', 'Checked', NULL, 4, NULL, NULL, 0, 5, 1),
    (6, 1, 'Tags', 'Tags', NULL, 5, 'DataDistribution', 1, 1, 6, 1),
    (7, 1, 'Area', 'Area', NULL, 2, NULL, NULL, 1, 7, 1),
    (8, 1, 'Comment', 'Comment', NULL, 3, NULL, NULL, 1, 8, 1),
    (11, 2, 'ID', 'ID', NULL, 1, NULL, NULL, 0, 1, 0),
    (12, 2, 'Area', 'Area', NULL, 2, NULL, NULL, 1, 2, 1),
    (13, 2, 'RetentionTime', 'RT [min]', NULL, 2, NULL, NULL, 1, 3, 0),
    (21, 3, 'ID', 'ID', NULL, 1, NULL, NULL, 0, 1, 0),
    (22, 3, 'ScanNumber', 'Scan', NULL, 1, NULL, NULL, 1, 2, 0),
    (31, 4, 'ID', 'ID', NULL, 1, NULL, NULL, 0, 1, 0),
    (32, 4, 'FileName', 'File', NULL, 3, NULL, NULL, 1, 2, 0);

CREATE TABLE DataTypesIDColumns (ColumnID INTEGER, Rank INTEGER);
INSERT INTO DataTypesIDColumns VALUES (1, 1), (11, 1), (21, 1), (31, 1);

CREATE TABLE DataTypesColumnExtendedData (ColumnID INTEGER, Name TEXT, ValueString TEXT);
INSERT INTO DataTypesColumnExtendedData VALUES (8, 'StorageFileOption_StorageFile', 'View');

CREATE TABLE ConnectedDataTypes (DataTypeID1 INTEGER, DataTypeID2 INTEGER, ConnectedTableName TEXT);
INSERT INTO ConnectedDataTypes VALUES (1, 2, 'CompoundsPeaks'), (2, 3, 'PeaksSpectra');

CREATE TABLE ConnectedDataTypesColumns (ColumnID INTEGER PRIMARY KEY, DataTypeID1 INTEGER, DataTypeID2 INTEGER,
    DBColumnName TEXT NOT NULL, Property_DisplayName TEXT, CustomDataType INTEGER, Nullable INTEGER);
INSERT INTO ConnectedDataTypesColumns VALUES
    (101, 1, 2, 'CompoundsID', NULL, 1, 0),
    (102, 1, 2, 'PeaksID', NULL, 1, 0),
    (103, 1, 2, 'Score', 'Match Score', 2, 1),
    (104, 1, 2, 'Area', 'Area', 2, 1),
    (111, 2, 3, 'PeaksID', NULL, 1, 0),
    (112, 2, 3, 'SpectraID', NULL, 1, 0);

CREATE TABLE ConnectedDataTypesIDColumns (ColumnID INTEGER, Rank INTEGER);
INSERT INTO ConnectedDataTypesIDColumns VALUES (101, 1), (102, 2), (111, 1), (112, 2);

CREATE TABLE Workflows (WorkflowID INTEGER PRIMARY KEY, WorkflowGUID TEXT, WorkflowName TEXT,
    WorkflowDescription TEXT, WorkflowType TEXT, Level INTEGER, Version INTEGER, WorkflowStartDate TEXT,
    WorkflowState INTEGER, Study TEXT, User TEXT, SoftwareVersion TEXT, MachineName TEXT, WorkflowXML TEXT);
INSERT INTO Workflows VALUES
    (2, 'b2', 'Consensus', NULL, 'Consensus', 1, 3, '2021-03-04 10:30:00.5+01:00', 1, 'Caffeine study',
        'analyst', '3.3', 'LAB-2', '<Workflow />'),
    (1, 'a1', 'Processing', 'Untargeted', 'Processing', 0, 3, '2021-03-04 10:11:12.1234567+01:00', 1,
        'Caffeine study', 'analyst', '3.3', 'LAB-2', '<Workflow />');

CREATE TABLE WorkflowMessages (MessageID INTEGER PRIMARY KEY, WorkflowID INTEGER, Level INTEGER,
    ProcessingNodeName TEXT, Time INTEGER, MessageKind INTEGER, Message TEXT);
INSERT INTO WorkflowMessages VALUES
    (1, 1, 0, 'Input Files', 637504494720000000, 0, 'started'),
    (2, 1, 0, 'Detect Compounds', 637504494780000000, 1, 'low intensity'),
    (3, 9, 0, 'Orphan', NULL, 0, 'no workflow');
"#;

const DATA: &str = r#"
CREATE TABLE Compounds (ID INTEGER PRIMARY KEY, Name TEXT, MolecularWeight REAL, Polarity INTEGER,
    Checked INTEGER NOT NULL DEFAULT 0, Tags BLOB, Area REAL);
INSERT INTO Compounds VALUES
    (1, 'Caffeine', 194.19, 1, 0, NULL, 1000.0),
    (2, 'Theobromine', 180.16, 1, 1, NULL, 500.0),
    (3, 'Paraxanthine', 180.16, 2, 0, NULL, 250.0),
    (4, 'Adenine', 135.13, NULL, 0, NULL, NULL);

CREATE TABLE Peaks (ID INTEGER PRIMARY KEY, Area REAL, RetentionTime REAL);
INSERT INTO Peaks VALUES
    (1, 600.0, 1.5), (2, 400.0, 2.5), (3, 500.0, 3.1), (4, 250.0, 4.0), (5, 50.0, 5.0);

CREATE TABLE Spectra (ID INTEGER PRIMARY KEY, ScanNumber INTEGER);
INSERT INTO Spectra VALUES (1, 100), (2, 101), (3, 102);

CREATE TABLE Samples (ID INTEGER PRIMARY KEY, FileName TEXT);
INSERT INTO Samples VALUES (1, 'run1.raw');

CREATE TABLE CompoundsPeaks (CompoundsID INTEGER, PeaksID INTEGER, Score REAL, Area REAL);
INSERT INTO CompoundsPeaks VALUES
    (1, 1, 0.9, 60.0), (1, 2, 0.4, 40.0), (2, 3, 0.8, 50.0), (3, 4, 0.7, 25.0);

CREATE TABLE PeaksSpectra (PeaksID INTEGER, SpectraID INTEGER);
INSERT INTO PeaksSpectra VALUES (1, 1), (1, 2), (3, 3);
"#;

const VIEW: &str = r#"
CREATE TABLE Compounds_Comment (ID INTEGER PRIMARY KEY, Comment TEXT);
INSERT INTO Compounds_Comment VALUES (1, 'reference standard');
"#;

/// A result file in a temporary directory.
pub struct Fixture {
    // keeps the directory alive
    _dir: TempDir,
    pub path: PathBuf,
}

impl Fixture {
    /// Result file with metadata and data, and its view file when
    /// `with_view` is set.
    pub fn new(with_view: bool) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("study.cdResult");

        let conn = Connection::open(&path).expect("create result file");
        conn.execute_batch(METADATA).expect("metadata");
        conn.execute_batch(DATA).expect("data");
        drop(conn);

        if with_view {
            let conn = Connection::open(view_path(&path)).expect("create view file");
            conn.execute_batch(VIEW).expect("view data");
        }

        Self { _dir: dir, path }
    }

    pub fn open(&self) -> Eds {
        self.open_with(Settings::default())
    }

    pub fn open_with(&self, settings: Settings) -> Eds {
        Eds::open(&self.path, settings, &ConverterRegistry::new()).expect("open result file")
    }

    /// Direct connection for checking what was written.
    pub fn raw(&self) -> Connection {
        Connection::open(&self.path).expect("open raw connection")
    }

    pub fn raw_view(&self) -> Connection {
        Connection::open(view_path(&self.path)).expect("open raw view connection")
    }
}

pub fn view_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push("View");
    PathBuf::from(name)
}

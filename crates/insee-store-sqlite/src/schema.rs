//! SQL schema for the INSEE reference database.
//!
//! Executed at every connection startup; idempotent thanks to
//! `IF NOT EXISTS`. Opening a store also re-locks the reference tables, so a
//! process killed mid-import never leaves them writable.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS region (
    reg_id  TEXT PRIMARY KEY CHECK (length(reg_id) = 2),
    name    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS departement (
    dep_id  TEXT PRIMARY KEY CHECK (length(dep_id) BETWEEN 2 AND 3),
    name    TEXT NOT NULL,
    reg_id  TEXT NOT NULL REFERENCES region(reg_id)
);

CREATE TABLE IF NOT EXISTS commune (
    com_id      INTEGER PRIMARY KEY,
    code_insee  TEXT NOT NULL UNIQUE CHECK (length(code_insee) = 5),
    name        TEXT NOT NULL,
    dep_id      TEXT NOT NULL REFERENCES departement(dep_id),
    population  INTEGER          -- from the optional population file
);

CREATE TABLE IF NOT EXISTS chef_lieu_region (
    reg_id  TEXT PRIMARY KEY REFERENCES region(reg_id),
    com_id  INTEGER NOT NULL REFERENCES commune(com_id)
);

CREATE TABLE IF NOT EXISTS chef_lieu_departement (
    dep_id  TEXT PRIMARY KEY REFERENCES departement(dep_id),
    com_id  INTEGER NOT NULL REFERENCES commune(com_id)
);

CREATE TABLE IF NOT EXISTS type_statistique (
    id           INTEGER PRIMARY KEY,
    nom          TEXT NOT NULL UNIQUE,
    description  TEXT
);

-- annee is the census year or the first year of a period; NULL for
-- timeless values such as the surface.
CREATE TABLE IF NOT EXISTS statistique (
    id         INTEGER PRIMARY KEY,
    com_id     INTEGER NOT NULL REFERENCES commune(com_id),
    type_id    INTEGER NOT NULL REFERENCES type_statistique(id),
    annee      INTEGER,
    annee_fin  INTEGER,
    valeur     NUMERIC,
    CONSTRAINT valid_years CHECK (annee_fin IS NULL OR annee_fin >= annee),
    UNIQUE (com_id, type_id, annee)
);

CREATE INDEX IF NOT EXISTS idx_statistique_com_id  ON statistique(com_id);
CREATE INDEX IF NOT EXISTS idx_statistique_type_id ON statistique(type_id);
CREATE INDEX IF NOT EXISTS idx_statistique_annee   ON statistique(annee);
CREATE INDEX IF NOT EXISTS idx_commune_dep_id      ON commune(dep_id);
CREATE INDEX IF NOT EXISTS idx_departement_reg_id  ON departement(reg_id);

-- Single row consulted by the protective triggers. 0 only while an import
-- holds the guard.
CREATE TABLE IF NOT EXISTS import_lock (
    id      INTEGER PRIMARY KEY CHECK (id = 1),
    locked  INTEGER NOT NULL
);

INSERT INTO import_lock (id, locked) VALUES (1, 1)
    ON CONFLICT (id) DO UPDATE SET locked = 1;

CREATE TRIGGER IF NOT EXISTS region_read_only_insert
BEFORE INSERT ON region
WHEN (SELECT locked FROM import_lock WHERE id = 1) = 1
BEGIN
    SELECT RAISE(ABORT, 'region and departement rows are read-only outside an import');
END;

CREATE TRIGGER IF NOT EXISTS region_read_only_update
BEFORE UPDATE ON region
WHEN (SELECT locked FROM import_lock WHERE id = 1) = 1
BEGIN
    SELECT RAISE(ABORT, 'region and departement rows are read-only outside an import');
END;

CREATE TRIGGER IF NOT EXISTS region_read_only_delete
BEFORE DELETE ON region
WHEN (SELECT locked FROM import_lock WHERE id = 1) = 1
BEGIN
    SELECT RAISE(ABORT, 'region and departement rows are read-only outside an import');
END;

CREATE TRIGGER IF NOT EXISTS departement_read_only_insert
BEFORE INSERT ON departement
WHEN (SELECT locked FROM import_lock WHERE id = 1) = 1
BEGIN
    SELECT RAISE(ABORT, 'region and departement rows are read-only outside an import');
END;

CREATE TRIGGER IF NOT EXISTS departement_read_only_update
BEFORE UPDATE ON departement
WHEN (SELECT locked FROM import_lock WHERE id = 1) = 1
BEGIN
    SELECT RAISE(ABORT, 'region and departement rows are read-only outside an import');
END;

CREATE TRIGGER IF NOT EXISTS departement_read_only_delete
BEFORE DELETE ON departement
WHEN (SELECT locked FROM import_lock WHERE id = 1) = 1
BEGIN
    SELECT RAISE(ABORT, 'region and departement rows are read-only outside an import');
END;

-- Latest known population of each commune: the most recent census
-- population statistic, else the stored population column.
CREATE VIEW IF NOT EXISTS commune_population AS
SELECT c.com_id, c.code_insee, c.name, c.dep_id,
       COALESCE(
         (SELECT s.valeur
            FROM statistique s
            JOIN type_statistique t ON t.id = s.type_id
           WHERE s.com_id = c.com_id
             AND t.nom LIKE '%!_POP' ESCAPE '!'
             AND s.annee IS NOT NULL
           ORDER BY s.annee DESC
           LIMIT 1),
         c.population) AS population
FROM commune c;

-- Census population per region and year.
CREATE VIEW IF NOT EXISTS population_regions AS
SELECT r.reg_id, r.name AS nom_region, s.annee, SUM(s.valeur) AS population
FROM region r
JOIN departement d      ON d.reg_id = r.reg_id
JOIN commune c          ON c.dep_id = d.dep_id
JOIN statistique s      ON s.com_id = c.com_id
JOIN type_statistique t ON t.id = s.type_id
WHERE t.nom LIKE '%!_POP' ESCAPE '!'
GROUP BY r.reg_id, r.name, s.annee;

PRAGMA user_version = 1;
";


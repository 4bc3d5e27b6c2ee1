use crate::catalog::Catalog;
use crate::executor::Row;

const NONE_MARKER: &str = "None";

const GENERATION_RULES: &str = "\
Use the table and column descriptions to decide which tables are needed.
Do NOT assume every table is required.

TABLE SELECTION RULES:
1. Select ONLY the tables required to answer the question.
2. A table is relevant if it holds columns needed in the query, is needed to
   join other required tables, or holds filtering information from the question.
3. Ignore unrelated tables.

SQL GENERATION RULES:
### SELECT
Pick every column that provides a value needed to explain the answer.

### JOIN
Join on the declared keys:
- product_id
- raw_material_id
- scenario_id
- record_id

### SUM + JOIN
When summing across joined tables, join first, apply SUM() after joining and
group by the higher-level entity (scenario, product, ...).

### WHERE
NEVER use exact matches (=) for text fields. Whenever the question mentions a
category label such as a product, supplier or city name, use:
    column LIKE '%value%'
Examples:
- \"Chem Alloy\" -> column LIKE '%Chem Alloy%'
- \"H1\" -> column LIKE '%H1%'
- \"Ankara\" -> column LIKE '%Ankara%'

### OUTPUT FORMAT
Return ONLY valid SQL. No explanation, no comments, no markdown.

### EXAMPLE
USER QUERY: Check all existing recipes. Are there any raw material inventory shortages?
SQL QUERY:
SELECT
    r.raw_material_id,
    m.raw_material_name,
    m.stock_quantity,
    SUM(r.recipe_quantity) AS total_required_quantity,
    (m.stock_quantity - SUM(r.recipe_quantity)) AS stock_balance
FROM opt_recipe AS r
JOIN opt_scenario AS s ON s.scenario_id = r.scenario_id
JOIN master_raw_material AS m ON m.raw_material_id = r.raw_material_id
GROUP BY r.raw_material_id, m.raw_material_name, m.stock_quantity
HAVING m.stock_quantity < SUM(r.recipe_quantity);";

const VALIDATION_RULES: &str = "\
Check ALL of the following:

### 1. SQL SYNTAX / EXECUTION ISSUES
- Did the database return an error record?
- Are any SQL keywords or clauses incorrect?
- Were invalid columns used?

### 2. RESULT RELEVANCE (VERY IMPORTANT)
Decide whether the returned rows contain the attributes needed to answer the question.
Examples:
- a question about stock status must include stock_quantity or stock.
- a question about density and moisture must include both properties.
- a question about recipe usage must include recipe_quantity or recipe_percentage.
- a question about a scenario must include scenario_id.
- a question about cost must include unit_cost, total_cost or a related cost field.
If any required field is missing, the SQL is invalid.

### 3. OUTPUT STRICT JSON ONLY:
{
  \"valid\": true/false,
  \"issues\": [\"...\"],
  \"regenerate_sql\": true/false
}";

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        NONE_MARKER
    } else {
        text
    }
}

/// render validator feedback; no feedback is spelled out, never left blank
pub fn render_issues(issues: &[String]) -> String {
    if issues.is_empty() {
        return NONE_MARKER.to_string();
    }

    issues
        .iter()
        .map(|issue| format!("- {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_generation_prompt(
    question: &str,
    catalog: &Catalog,
    previous_sql: &str,
    issues: &[String],
) -> String {
    format!(
        "You are a senior SQL architect.\n\n\
         You are given:\n\n\
         1. USER QUERY:\n{}\n\n\
         2. FULL TABLE METADATA (JSON):\n{}\n\n\
         3. PREVIOUS SQL QUERY (fix its errors or improve it):\n{}\n\n\
         4. VALIDATION FEEDBACK (fix ALL issues listed):\n{}\n\n\
         {}\n\n\
         GENERATE THE SQL NOW:\n",
        question,
        catalog.to_prompt_json(),
        or_none(previous_sql),
        render_issues(issues),
        GENERATION_RULES,
    )
}

pub fn build_validation_prompt(
    question: &str,
    sql: &str,
    result: &[Row],
    catalog: &Catalog,
) -> String {
    let result_text = serde_json::to_string_pretty(result).unwrap_or_else(|_| "[]".to_string());

    format!(
        "You are an expert SQL validator.\n\n\
         You are given:\n\
         USER QUERY:\n{}\n\n\
         SQL QUERY:\n{}\n\n\
         SQL RESULT:\n{}\n\n\
         TABLE METADATA:\n{}\n\n\
         {}\n\n\
         OUTPUT JSON:\n",
        question,
        or_none(sql),
        result_text,
        catalog.to_prompt_json(),
        VALIDATION_RULES,
    )
}

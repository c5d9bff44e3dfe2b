//! Command-level runs over real files

mod common;

use pii_detector::cli::commands::classify::ClassifyArgs;
use pii_detector::cli::commands::evaluate::{EvaluateArgs, ReportFormat};
use pii_detector::cli::commands::validate::ValidateArgs;
use pii_detector::detection::AggregationPolicy;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn classify_args(input: &Path) -> ClassifyArgs {
    ClassifyArgs {
        input: input.display().to_string(),
        output: None,
        evidence: None,
        policy: None,
        max_rows: None,
        llm: false,
        reuse_existing: false,
        report: None,
    }
}

fn write_config(dir: &Path, extra: &str) -> String {
    let weights = common::weights_copy(dir);
    let path = dir.join("pii-detector.toml");
    fs::write(
        &path,
        format!(
            "[name]\nweights_path = \"{}\"\n\n{extra}",
            weights.display().to_string().replace('\\', "/")
        ),
    )
    .unwrap();
    path.display().to_string()
}

#[tokio::test]
async fn test_classify_writes_columns_evidence_and_report() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let input = dir.path().join("pedidos.csv");
    fs::write(
        &input,
        "ID;Texto Mascarado;Orgao\n\
         1;Meu CPF é 529.982.247-25 para cadastro.;SEF\n\
         2;Solicito informações sobre contratos públicos.;SEEDF\n\
         3;Contato: exemplo@dominio.com;DETRAN\n",
    )
    .unwrap();
    let evidence = dir.path().join("saida/evidencias.jsonl");
    let report = dir.path().join("relatorio.json");

    let args = ClassifyArgs {
        evidence: Some(evidence.display().to_string()),
        report: Some(report.display().to_string()),
        ..classify_args(&input)
    };
    assert_eq!(args.execute(&config).await.unwrap(), 0);

    let (headers, rows) = common::read_csv(&dir.path().join("pedidos_classificado.csv"), b';');
    assert_eq!(&headers[..3], &["ID", "Texto Mascarado", "Orgao"]);
    assert_eq!(
        &headers[3..],
        &["nao_publico", "detector_prioritario", "cpf", "email", "telefone", "endereco", "rg", "nome"]
    );
    let nao_publico = common::column(&headers, "nao_publico");
    let dominant = common::column(&headers, "detector_prioritario");
    let values: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (r[nao_publico].as_str(), r[dominant].as_str()))
        .collect();
    assert_eq!(values, vec![("1", "cpf"), ("0", ""), ("1", "email")]);
    assert_eq!(rows[0][2], "SEF");

    let lines: Vec<serde_json::Value> = fs::read_to_string(&evidence)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["id"], "1");
    assert_eq!(lines[0]["detector_prioritario"], "cpf");

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["records_processed"], 3);
    assert_eq!(report["sensitive_records"], 2);
}

#[tokio::test]
async fn test_rows_past_limit_are_written_as_zero() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    fs::write(
        &input,
        "id,texto\n1,CPF 529.982.247-25\n2,CPF 529.982.247-25\n",
    )
    .unwrap();

    let args = ClassifyArgs {
        output: Some(output.display().to_string()),
        max_rows: Some(1),
        policy: Some(AggregationPolicy::PriorityStop),
        ..classify_args(&input)
    };
    assert_eq!(args.execute(&config).await.unwrap(), 0);

    let (headers, rows) = common::read_csv(&output, b',');
    let cpf = common::column(&headers, "cpf");
    assert_eq!(rows[0][cpf], "1");
    assert_eq!(rows[1][cpf], "0");
}

#[tokio::test]
async fn test_missing_columns_exit_with_input_error() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let input = dir.path().join("in.csv");
    fs::write(&input, "codigo,descricao\n1,teste\n").unwrap();

    assert_eq!(classify_args(&input).execute(&config).await.unwrap(), 1);
    assert!(!dir.path().join("in_classificado.csv").exists());
}

#[tokio::test]
async fn test_invalid_fragment_config_exits_with_config_error() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "[detection]\nwindow = 5\noverlap = 5\n");
    let input = dir.path().join("in.csv");
    fs::write(&input, "ID,Texto Mascarado\n1,teste\n").unwrap();

    assert_eq!(classify_args(&input).execute(&config).await.unwrap(), 2);
    assert_eq!(ValidateArgs {}.execute(&config).await.unwrap(), 2);
}

#[tokio::test]
async fn test_reuse_existing_columns() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "[detection]\npolicy = \"priority-label\"\n");
    let input = dir.path().join("in.csv");
    let output = dir.path().join("out.csv");
    fs::write(
        &input,
        "ID,Texto Mascarado,rg,nome\n1,Solicito o edital.,1,0\n2,Solicito o edital.,talvez,0\n",
    )
    .unwrap();

    let args = ClassifyArgs {
        output: Some(output.display().to_string()),
        reuse_existing: true,
        ..classify_args(&input)
    };
    assert_eq!(args.execute(&config).await.unwrap(), 0);

    let (headers, rows) = common::read_csv(&output, b',');
    let dominant = common::column(&headers, "detector_prioritario");
    assert_eq!(rows[0][dominant], "rg");
    assert_eq!(rows[1][dominant], "");
    // existing columns are updated in place rather than duplicated
    assert_eq!(headers.iter().filter(|h| *h == "rg").count(), 1);
}

#[tokio::test]
async fn test_classify_then_evaluate() {
    let dir = tempdir().unwrap();
    let config = write_config(dir.path(), "");
    let input = dir.path().join("amostra.csv");
    fs::write(
        &input,
        "ID,Texto Mascarado\n\
         1,Meu CPF é 529.982.247-25\n\
         2,Solicito o edital do concurso.\n\
         3,Telefone: (11) 98765-4321\n",
    )
    .unwrap();
    assert_eq!(classify_args(&input).execute(&config).await.unwrap(), 0);

    let gold = dir.path().join("gold.json");
    fs::write(
        &gold,
        r#"[{"ID": 1, "nao_publico": 1}, {"ID": 2, "nao_publico": 1}, {"ID": 3, "nao_publico": 1}]"#,
    )
    .unwrap();
    let report = dir.path().join("avaliacao.json");
    let args = EvaluateArgs {
        predictions: dir.path().join("amostra_classificado.csv").display().to_string(),
        gold: gold.display().to_string(),
        format: ReportFormat::Console,
        output: Some(report.display().to_string()),
    };
    assert_eq!(args.execute().await.unwrap(), 0);

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["aggregate"]["tp"], 2);
    assert_eq!(json["aggregate"]["fn"], 1);
    assert_eq!(json["aggregate"]["precision"], 1.0);
}

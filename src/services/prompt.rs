// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prompt assembly for market analyses.
//!
//! The analysis is aimed at the Brazilian market, so the template itself is
//! written in Portuguese.

use crate::services::web_search::SearchResult;
use chrono::{DateTime, Datelike, Utc};
use std::fmt::Write;
use uuid::Uuid;

/// Persona for chat-style providers.
pub const SYSTEM_PROMPT: &str = "Você é um especialista em pesquisa de mercado e lançamentos \
digitais com mais de 15 anos de experiência. Sua especialidade é analisar mercados brasileiros \
e criar estratégias de lançamento de produtos digitais baseadas em dados reais e insights profundos.";

/// User input for one analysis request.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub segmento: String,
    pub contexto_adicional: Option<String>,
    pub usuario_id: Uuid,
    pub requested_at: DateTime<Utc>,
}

/// Related search terms offered to the model as trend hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendHints {
    pub keyword: String,
    pub related_keywords: Vec<String>,
}

impl TrendHints {
    pub fn for_segment(segment: &str, now: DateTime<Utc>) -> Self {
        Self {
            keyword: segment.to_string(),
            related_keywords: vec![
                format!("{} {}", segment, now.year()),
                format!("como {}", segment),
                format!("{} online", segment),
                format!("melhor {}", segment),
                format!("{} gratis", segment),
            ],
        }
    }
}

/// The research queries run for a segment, in order.
///
/// The first query carries the year as a recency hint.
pub fn search_queries(segment: &str, year: i32) -> [String; 5] {
    [
        format!("{} mercado brasileiro {}", segment, year),
        format!("{} tendências consumidor", segment),
        format!("{} concorrentes principais", segment),
        format!("{} preços mercado", segment),
        format!("{} público alvo perfil", segment),
    ]
}

/// Build the full analysis prompt.
pub fn build_analysis_prompt(
    context: &AnalysisContext,
    research: &[SearchResult],
    trends: &TrendHints,
) -> String {
    let mut prompt = String::with_capacity(6 * 1024);

    prompt.push_str(
        "Com base no contexto fornecido abaixo, realize uma pesquisa completa e detalhada \
         seguindo EXATAMENTE esta estrutura:\n\n",
    );

    prompt.push_str("**CONTEXTO FORNECIDO:**\n");
    let _ = writeln!(prompt, "- Segmento: {}", context.segmento);
    let extra = context
        .contexto_adicional
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("Não fornecido");
    let _ = writeln!(prompt, "- Contexto adicional: {}", extra);
    let _ = writeln!(
        prompt,
        "- Data da análise: {}",
        crate::time_utils::format_utc_rfc3339(context.requested_at)
    );

    prompt.push_str("\n**PESQUISAS WEB REALIZADAS:**\n");
    if research.is_empty() {
        prompt.push_str("- Nenhum resultado disponível\n");
    }
    for result in research {
        let _ = writeln!(prompt, "- {}: {}", result.title, result.snippet);
    }

    prompt.push_str("\n**DADOS DE TENDÊNCIAS:**\n");
    let _ = writeln!(prompt, "- Palavra-chave: {}", trends.keyword);
    let _ = writeln!(
        prompt,
        "- Palavras relacionadas: {}",
        trends.related_keywords.join(", ")
    );

    prompt.push('\n');
    prompt.push_str(ANALYSIS_SECTIONS);
    prompt
}

const ANALYSIS_SECTIONS: &str = "\
## 🎯 DEFINIÇÃO DO ESCOPO
Identifique e detalhe:
- Segmento principal e subsegmentos
- Produto/serviço ideal para lançamento
- Proposta de valor única

## 👥 ANÁLISE DO AVATAR (CLIENTE IDEAL)

### Demografia:
- Faixa etária predominante
- Gênero e distribuição
- Localização geográfica principal
- Faixa de renda média
- Nível de escolaridade comum
- Profissões mais frequentes

### Psicografia:
- 3 valores principais
- Estilo de vida característico
- 2 principais aspirações
- 3 medos mais comuns
- 2 frustrações recorrentes

### Comportamento Digital:
- 2 plataformas mais usadas
- Horários de pico online
- Tipos de conteúdo preferidos
- Influenciadores que seguem

## 💔 MAPEAMENTO DE DORES E DESEJOS
Liste as 5 principais dores com descrição detalhada, impacto na vida e nível de urgência \
(Alta/Média/Baixa). Identifique estado atual vs. estado desejado, obstáculos percebidos e o \
sonho secreto não verbalizado.

## 🏆 ANÁLISE DA CONCORRÊNCIA
- 2 concorrentes diretos principais (com preços, USP, forças e fraquezas)
- 2 concorrentes indiretos
- 3 gaps identificados no mercado

## 💰 ANÁLISE DE MERCADO E METRIFICAÇÃO
### Calcule o TAM/SAM/SOM:
- TAM: População total × % mercado × ticket médio anual
- SAM: TAM × % segmento × % alcance realista
- SOM: SAM × % market share possível

### Identifique:
- Volume de busca mensal do segmento
- Tendências em alta e em queda
- Sazonalidade (melhores e piores meses)

## 🎯 ANÁLISE DE PALAVRAS-CHAVE E CUSTOS
Pesquise as 5 principais palavras-chave com volume de busca mensal, CPC e CPM médios, \
dificuldade SEO e intenção de busca. Estime para Facebook, Google, YouTube e TikTok: CPM médio, \
CPC médio, CPL médio e taxa de conversão esperada.

## 📊 MÉTRICAS DE PERFORMANCE
- CAC médio por canal
- Funil de conversão padrão (%)
- LTV médio e LTV:CAC ratio
- ROI esperado por canal

## 🗣️ VOZ DO MERCADO
- 3 principais objeções e como contorná-las
- Linguagem específica (termos, gírias, gatilhos)
- 3 crenças limitantes comuns

## 📊 HISTÓRICO DE LANÇAMENTOS
- 2 cases de sucesso (com números)
- 1 fracasso notável e lições aprendidas

## 💸 ANÁLISE DE PREÇOS
- Faixas de preço (Low/Mid/High ticket)
- Elasticidade e sensibilidade a preço
- Sweet spot de preço

## 🚀 ESTRATÉGIA DE AQUISIÇÃO
- Mix ideal de canais (% do budget)
- Budget por fase (pré/lançamento/pós)
- CPL esperado por canal

## 📈 PROJEÇÕES
Apresente 3 cenários (conservador/realista/otimista) com taxa de conversão, faturamento \
projetado e ROI esperado.

## 🎁 BÔNUS E GARANTIAS
- 3 bônus valorizados com valor percebido
- Tipo de garantia ideal

## 🎯 SÍNTESE ESTRATÉGICA
- Big Idea única para o lançamento
- Promessa principal irresistível
- Mecanismo único de entrega
- Provas de conceito necessárias
- Meta SMART completa

## 💡 PLANO DE AÇÃO
Liste 7 próximos passos prioritários e práticos.

---

**IMPORTANTE**:
- Use dados reais e atualizados quando possível
- Faça estimativas conservadoras baseadas em padrões do mercado
- Seja específico com números e métricas
- Foque em insights acionáveis
- Base suas análises nas pesquisas web fornecidas
- Considere o contexto brasileiro

Agora, realize a pesquisa completa com base no contexto fornecido.
";

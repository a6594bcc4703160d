//! Static HTML served by the kiosk.
//!
//! Three pages: the professional dashboard (`/`), the display mirror
//! (`/display`) and the survey form (`/survey`). All polling is plain
//! `fetch` against the JSON routes with cache busters; nothing external is
//! loaded, since the AP has no upstream.
//!
//! The survey question order is load-bearing: question *i* becomes bit *i*
//! of the submitted word, and the triage scoring and the `alerts`/`basic`
//! aggregates are tied to exactly this order.

/// Professional dashboard: KPIs, per-color filter, alerts, per-question
/// yes rates. Polls `/stats.json` once per second.
pub const DASHBOARD_HTML: &str = r#"<!doctype html><html><head><meta charset=utf-8>
<meta name=viewport content='width=device-width,initial-scale=1'>
<title>TheraLink - Staff</title>
<style>
body{font-family:system-ui,sans-serif;margin:16px;background:#f4f6fb;color:#0e1320}
nav{display:flex;gap:12px;margin-bottom:12px}
nav a{padding:8px 12px;border:1px solid #e2e6ef;background:#fff;border-radius:12px;text-decoration:none;color:#0e1320}
.chips{display:flex;gap:8px;margin:6px 0 12px}
.chip{padding:8px 12px;border:1px solid #e2e6ef;border-radius:999px;background:#fff;cursor:pointer}
.chip.active{border-color:#8892ad;box-shadow:0 0 0 2px rgba(17,17,17,.08)}
.grid{display:grid;grid-template-columns:repeat(auto-fit,minmax(280px,1fr));gap:12px}
.card{border:1px solid #e6e9f2;border-radius:16px;padding:14px;background:#fff}
.title{margin:0 0 8px;font-size:16px;font-weight:700}
.kpi{display:inline-block;border:1px solid #edf0f7;padding:10px;border-radius:12px;background:#fbfcff;min-width:120px;margin:4px}
.kpi .l{font-size:12px;color:#6a7490}.kpi .v{font-size:26px;font-weight:800}
.bar{height:14px;background:#2d6cdf;border-radius:4px}
.q{display:flex;align-items:center;gap:8px;margin:4px 0;font-size:13px}
.q span:first-child{width:30px;color:#6a7490}
</style></head><body>
<nav><a href='/'>Staff</a><a href='/display'>Display</a><a href='/download.csv'>Download CSV</a></nav>
<div class=chips id=chips>
<div class='chip active' data-c='all'>All</div>
<div class=chip data-c='verde'>Green group</div>
<div class=chip data-c='amarelo'>Yellow group</div>
<div class=chip data-c='vermelho'>Red group</div>
</div>
<div class=grid>
<div class=card><div class=title>Heart rate & check-ins</div>
<div class=kpi><div class=l>Mean BPM</div><div class=v id=bpm>--</div></div>
<div class=kpi><div class=l>BPM spread</div><div class=v id=bpmStd>--</div></div>
<div class=kpi><div class=l>Check-ins</div><div class=v id=checkins>0</div></div>
<div class=kpi><div class=l>Engagement</div><div class=v id=engage>--</div></div>
</div>
<div class=card><div class=title>Wellbeing</div>
<div class=kpi><div class=l>Wellbeing index</div><div class=v id=well>--</div></div>
<div class=kpi><div class=l>Calm index</div><div class=v id=calm>--</div></div>
</div>
<div class=card><div class=title>Wristbands</div>
<div class=kpi><div class=l>Green</div><div class=v id=cVerde>0</div></div>
<div class=kpi><div class=l>Yellow</div><div class=v id=cAmarelo>0</div></div>
<div class=kpi><div class=l>Red</div><div class=v id=cVermelho>0</div></div>
</div>
<div class=card><div class=title>Alerts</div>
<div class=kpi><div class=l>Crisis now</div><div class=v id=alCrisis>0</div></div>
<div class=kpi><div class=l>Avoiding group</div><div class=v id=alAvoid>0</div></div>
<div class=kpi><div class=l>Wants to talk</div><div class=v id=alTalk>0</div></div>
<div class=kpi><div class=l>No recent meal</div><div class=v id=noMeal>0</div></div>
<div class=kpi><div class=l>Poor sleep</div><div class=v id=poorSleep>0</div></div>
</div>
<div class=card style='grid-column:1/-1'><div class=title>"Yes" rate per question</div><div id=qs></div></div>
</div>
<script>
let flt='all';
document.getElementById('chips').addEventListener('click',e=>{
  const el=e.target.closest('.chip');if(!el)return;flt=el.dataset.c;
  document.querySelectorAll('.chip').forEach(c=>c.classList.toggle('active',c.dataset.c===flt));tick();});
const fin=v=>typeof v==='number'&&Number.isFinite(v);
async function tick(){try{
  let url='/stats.json?t='+Date.now();if(flt!=='all')url+='&color='+flt;
  const s=await fetch(url,{cache:'no-store'}).then(r=>r.json());
  document.getElementById('bpm').textContent=s.bpm_n?s.bpm_mean.toFixed(1):'--';
  document.getElementById('bpmStd').textContent=fin(s.bpm_stddev)?s.bpm_stddev.toFixed(1):'--';
  document.getElementById('checkins').textContent=s.checkins_total;
  document.getElementById('engage').textContent=fin(s.engagement_rate)?Math.round(s.engagement_rate*100)+'%':'--';
  document.getElementById('well').textContent=fin(s.wellbeing_index)?Math.round(s.wellbeing_index)+'%':'--';
  document.getElementById('calm').textContent=fin(s.calm_index)?Math.round(s.calm_index)+'%':'--';
  document.getElementById('cVerde').textContent=s.cores.verde;
  document.getElementById('cAmarelo').textContent=s.cores.amarelo;
  document.getElementById('cVermelho').textContent=s.cores.vermelho;
  const sv=s.survey||{};
  document.getElementById('alCrisis').textContent=sv.alerts?sv.alerts.crisis:0;
  document.getElementById('alAvoid').textContent=sv.alerts?sv.alerts.avoid:0;
  document.getElementById('alTalk').textContent=sv.alerts?sv.alerts.talk:0;
  document.getElementById('noMeal').textContent=sv.basic?sv.basic.no_meal:0;
  document.getElementById('poorSleep').textContent=sv.basic?sv.basic.poor_sleep:0;
  const qs=document.getElementById('qs');qs.innerHTML='';
  (sv.rate||[]).forEach((r,i)=>{const d=document.createElement('div');d.className='q';
    d.innerHTML='<span>Q'+(i+1)+'</span><div class=bar style="width:'+Math.round(r*260)+'px"></div><span>'+Math.round(r*100)+'%</span>';
    qs.appendChild(d);});
}catch(e){}}
setInterval(tick,1000);tick();
</script></body></html>"#;

/// Display mirror: the four kiosk lines, full screen. Jumps to `/survey`
/// the moment survey-mode turns on.
pub const DISPLAY_HTML: &str = r#"<!doctype html><html><head><meta charset=utf-8>
<meta name=viewport content='width=device-width,initial-scale=1'>
<title>TheraLink - Display</title>
<style>
html,body{height:100%;margin:0}
body{font-family:system-ui,sans-serif;background:#0e1014;color:#f2f4f8;display:flex;align-items:center;justify-content:center}
.panel{width:min(960px,94vw);padding:24px;border-radius:20px;background:#141821}
.line{min-height:1.3em;font-weight:800;font-size:clamp(22px,6vh,40px)}
</style></head><body>
<div class=panel>
<div id=l1 class=line>&nbsp;</div><div id=l2 class=line>&nbsp;</div>
<div id=l3 class=line>&nbsp;</div><div id=l4 class=line>&nbsp;</div>
</div>
<script>
let jumped=false;
async function tick(){try{
  const st=await fetch('/survey_state.json?t='+Date.now(),{cache:'no-store'}).then(r=>r.json()).catch(()=>({mode:0}));
  if(!jumped&&st.mode){jumped=true;location.replace('/survey?t='+Date.now());return;}
  const s=await fetch('/oled.json?t='+Date.now(),{cache:'no-store'}).then(r=>r.json());
  for(let i=1;i<=4;i++){document.getElementById('l'+i).textContent=s['l'+i]||' ';}
}catch(e){}}
setInterval(tick,500);tick();
</script></body></html>"#;

/// The ten-question form. Refuses to submit until every question has an
/// answer; the answer string is built leftmost = question 1.
pub const SURVEY_FORM_HTML: &str = r#"<!doctype html><html><head><meta charset=utf-8>
<meta name=viewport content='width=device-width,initial-scale=1'>
<title>TheraLink - Survey</title>
<style>
body{font-family:system-ui,sans-serif;margin:18px;background:#0f1220;color:#eef1f6}
.wrap{max-width:920px;margin:0 auto}h1{font-size:22px}
.card{background:#13172a;border:1px solid #252b45;border-radius:14px;padding:16px;margin:12px 0}
.q{display:flex;justify-content:space-between;align-items:center;padding:12px 10px;border-bottom:1px solid #1e2440}
.q:last-child{border-bottom:none}.lbl{max-width:72%}
.chip{padding:10px 14px;border-radius:12px;border:1px solid #2b3358;background:#0f1428;color:#eef1f6;cursor:pointer;margin-left:6px}
.chip.sel{outline:2px solid #2d6cdf}.primary{background:#2d6cdf;border-color:#2d6cdf}
</style></head><body><div class=wrap>
<h1>Quick survey (10 questions)</h1>
<div class=card id=form>
<div class=q><div class=lbl>Do you feel strong physical pain right now?</div><div><span class=chip data-i=0 data-v=1>Yes</span><span class=chip data-i=0 data-v=0>No</span></div></div>
<div class=q><div class=lbl>Did you eat and hydrate properly today?</div><div><span class=chip data-i=1 data-v=1>Yes</span><span class=chip data-i=1 data-v=0>No</span></div></div>
<div class=q><div class=lbl>Did you sleep well in the last 24 hours?</div><div><span class=chip data-i=2 data-v=1>Yes</span><span class=chip data-i=2 data-v=0>No</span></div></div>
<div class=q><div class=lbl>Are you feeling strong fatigue?</div><div><span class=chip data-i=3 data-v=1>Yes</span><span class=chip data-i=3 data-v=0>No</span></div></div>
<div class=q><div class=lbl>Did you have a strong conflict with someone?</div><div><span class=chip data-i=4 data-v=1>Yes</span><span class=chip data-i=4 data-v=0>No</span></div></div>
<div class=q><div class=lbl>Did you feel very nervous today?</div><div><span class=chip data-i=5 data-v=1>Yes</span><span class=chip data-i=5 data-v=0>No</span></div></div>
<div class=q><div class=lbl>Is it hard to concentrate today?</div><div><span class=chip data-i=6 data-v=1>Yes</span><span class=chip data-i=6 data-v=0>No</span></div></div>
<div class=q><div class=lbl>Do you feel at risk of a crisis right now?</div><div><span class=chip data-i=7 data-v=1>Yes</span><span class=chip data-i=7 data-v=0>No</span></div></div>
<div class=q><div class=lbl>Are you avoiding being with the group today?</div><div><span class=chip data-i=8 data-v=1>Yes</span><span class=chip data-i=8 data-v=0>No</span></div></div>
<div class=q><div class=lbl>Do you want to talk with an adult after check-in?</div><div><span class=chip data-i=9 data-v=1>Yes</span><span class=chip data-i=9 data-v=0>No</span></div></div>
</div>
<button id=send class='chip primary'>Send answers</button>
<a class=chip href='/display'>Back to display</a>
<p style='opacity:.7'>Answers are local and anonymous.</p>
<script>
const sel=new Array(10).fill(-1);
document.querySelectorAll('.chip[data-i]').forEach(b=>{b.addEventListener('click',()=>{
  const i=+b.dataset.i;sel[i]=+b.dataset.v;
  b.parentElement.querySelectorAll('.chip').forEach(x=>x.classList.remove('sel'));b.classList.add('sel');});});
document.getElementById('send').addEventListener('click',()=>{
  if(sel.some(v=>v<0)){alert('Please answer every question.');return;}
  location.replace('/survey_submit?ans='+sel.join('')+'&t='+Date.now());});
</script></div></body></html>"#;

/// Served on `/survey` while survey-mode is off.
pub const SURVEY_CLOSED_HTML: &str = r#"<!doctype html><html><head><meta charset=utf-8>
<meta name=viewport content='width=device-width,initial-scale=1'>
<title>TheraLink - Survey</title></head>
<body style='font-family:system-ui,sans-serif;background:#0f1220;color:#eef1f6;text-align:center;padding-top:20vh'>
<h1>Survey closed</h1>
<p>Start a check-in at the kiosk first.</p>
<p><a style='color:#cfe1ff' href='/display'>Back to display</a></p>
</body></html>"#;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_survey_form_covers_ten_questions() {
        for i in 0..10 {
            let yes = std::format!("data-i={i} data-v=1");
            let no = std::format!("data-i={i} data-v=0");
            assert!(SURVEY_FORM_HTML.contains(&yes), "missing yes chip for q{i}");
            assert!(SURVEY_FORM_HTML.contains(&no), "missing no chip for q{i}");
        }
        assert!(SURVEY_FORM_HTML.contains("/survey_submit?ans="));
    }

    #[test]
    fn test_dashboard_polls_stats() {
        assert!(DASHBOARD_HTML.contains("/stats.json"));
        for color in ["verde", "amarelo", "vermelho"] {
            assert!(DASHBOARD_HTML.contains(color), "missing {color} filter");
        }
    }

    #[test]
    fn test_display_mirror_polls_state_and_lines() {
        assert!(DISPLAY_HTML.contains("/survey_state.json"));
        assert!(DISPLAY_HTML.contains("/oled.json"));
        assert!(DISPLAY_HTML.contains("location.replace('/survey"));
    }
}
